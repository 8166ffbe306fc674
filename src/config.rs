//! Search configuration
//!
//! Defaults match the public DataJud rate limits: batches of five endpoints,
//! one second between batches, thirty seconds per request.

use std::time::Duration;

use crate::credentials::DEFAULT_LOGIN_URL;
use crate::error::{Result, SearchError};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_PACING_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_RECENT_EVENTS: usize = 3;

/// Tunables for one search pipeline
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Endpoints queried concurrently per batch (never zero)
    pub batch_size: usize,
    /// Pause between consecutive batches
    pub pacing_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Hits requested per endpoint
    pub page_size: usize,
    /// Movements kept per normalized item
    pub recent_events: usize,
    /// Optional wall-clock budget for the whole search
    pub search_deadline: Option<Duration>,
    /// DataJud public API key
    pub api_key: Option<String>,
    /// OAB login endpoint for the credentialed tier
    pub login_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pacing_delay: Duration::from_millis(DEFAULT_PACING_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            recent_events: DEFAULT_RECENT_EVENTS,
            search_deadline: None,
            api_key: None,
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `CNPJ_SEARCH_*` environment variables
    ///
    /// Unset variables keep their defaults. The API key is read from
    /// `DATAJUD_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = parse_var::<usize>(&lookup, "CNPJ_SEARCH_BATCH_SIZE")? {
            config = config.with_batch_size(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "CNPJ_SEARCH_PACING_MS")? {
            config.pacing_delay = Duration::from_millis(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "CNPJ_SEARCH_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<usize>(&lookup, "CNPJ_SEARCH_PAGE_SIZE")? {
            config.page_size = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "CNPJ_SEARCH_RECENT_EVENTS")? {
            config.recent_events = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "CNPJ_SEARCH_DEADLINE_SECS")? {
            config.search_deadline = Some(Duration::from_secs(v));
        }
        config.api_key = lookup("DATAJUD_API_KEY").filter(|k| !k.trim().is_empty());
        if let Some(url) = lookup("CNPJ_SEARCH_LOGIN_URL") {
            config.login_url = url;
        }

        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_recent_events(mut self, recent_events: usize) -> Self {
        self.recent_events = recent_events;
        self
    }

    pub fn with_search_deadline(mut self, deadline: Duration) -> Self {
        self.search_deadline = Some(deadline);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SearchError::Config(format!("{key} has invalid value '{raw}'"))),
    }
}
