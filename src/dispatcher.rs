//! Batched fan-out dispatcher
//!
//! Splits an endpoint set into fixed-size batches. Every endpoint in a batch
//! is queried concurrently and the batch settles completely before the next
//! one starts; a pacing delay separates batches to respect upstream rate
//! limits. Results are merged into a per-invocation [`SearchContext`] only
//! after each join point, so concurrent calls never share mutable state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::time::Instant;
use uuid::Uuid;

use crate::catalog::{AuthTier, Category, EndpointDescriptor};
use crate::client::EndpointSearchClient;
use crate::cnpj::Cnpj;
use crate::config::SearchConfig;
use crate::tier::{profile, ESTIMATES_NOTE};
use crate::transport::{AuthContext, SearchTransport};
use crate::types::{EndpointError, MergedSearchResult, RawSearchResult, TierError};

pub const DEADLINE_EXCEEDED: &str = "Search deadline exceeded before endpoint settled";

// =============================================================================
// Per-invocation context
// =============================================================================

/// Accumulator for one search invocation
///
/// Never shared between searches. Results are keyed by endpoint id: a second
/// result for the same endpoint replaces the first in place.
#[derive(Debug)]
pub struct SearchContext {
    search_id: Uuid,
    cnpj: Cnpj,
    started_at: DateTime<Utc>,
    deadline: Option<Instant>,
    category_filter: Option<Category>,
    results: Vec<RawSearchResult>,
    features: Vec<String>,
    tier_errors: Vec<TierError>,
    batches: usize,
    pacing_delays: usize,
}

impl SearchContext {
    pub fn new(cnpj: Cnpj) -> Self {
        Self {
            search_id: Uuid::new_v4(),
            cnpj,
            started_at: Utc::now(),
            deadline: None,
            category_filter: None,
            results: Vec::new(),
            features: Vec::new(),
            tier_errors: Vec::new(),
            batches: 0,
            pacing_delays: 0,
        }
    }

    /// Abandon unsettled endpoints once `budget` has elapsed
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    pub fn with_category_filter(mut self, category: Option<Category>) -> Self {
        self.category_filter = category;
        self
    }

    pub fn cnpj(&self) -> &Cnpj {
        &self.cnpj
    }

    pub fn results(&self) -> &[RawSearchResult] {
        &self.results
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn pacing_delays(&self) -> usize {
        self.pacing_delays
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn record(&mut self, endpoint: &EndpointDescriptor, result: RawSearchResult) {
        if result.is_success() {
            for feature in &endpoint.features {
                if !self.features.contains(feature) {
                    self.features.push(feature.clone());
                }
            }
        }
        match self
            .results
            .iter_mut()
            .find(|r| r.endpoint_id == result.endpoint_id)
        {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn record_tier_error(&mut self, tier: AuthTier, message: impl Into<String>) {
        self.tier_errors.push(TierError {
            tier,
            message: message.into(),
        });
    }

    /// Freeze into the caller-facing result
    ///
    /// `tier_reached` selects the coverage and quality labels.
    pub fn into_merged(self, requested_tier: AuthTier, tier_reached: AuthTier) -> MergedSearchResult {
        let profile = profile(tier_reached);
        let errors: Vec<EndpointError> = self
            .results
            .iter()
            .filter_map(EndpointError::from_result)
            .collect();
        let endpoints_succeeded = self.results.iter().filter(|r| r.is_success()).count();
        let total_items = self.results.iter().map(|r| r.total).sum();

        MergedSearchResult {
            search_id: self.search_id,
            cnpj: self.cnpj.formatted(),
            searched_at: self.started_at,
            category_filter: self.category_filter,
            requested_tier,
            tier_reached,
            endpoints_attempted: self.results.len(),
            endpoints_succeeded,
            total_items,
            results: self.results,
            errors,
            tier_errors: self.tier_errors,
            enhanced_features: self.features,
            coverage: profile.coverage.to_string(),
            data_quality: profile.data_quality,
            strategy: profile.strategy.to_string(),
            estimates_note: ESTIMATES_NOTE.to_string(),
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

pub struct BatchedDispatcher {
    client: EndpointSearchClient,
    batch_size: usize,
    pacing_delay: Duration,
}

impl BatchedDispatcher {
    pub fn new(transport: Arc<dyn SearchTransport>, config: &SearchConfig) -> Self {
        Self {
            client: EndpointSearchClient::new(transport, config),
            batch_size: config.batch_size.max(1),
            pacing_delay: config.pacing_delay,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Query every endpoint in `endpoints` exactly once
    ///
    /// Each endpoint contributes one entry to `ctx`, either a result or a
    /// failure. Returns the number of batches issued.
    pub async fn dispatch(
        &self,
        ctx: &mut SearchContext,
        endpoints: &[EndpointDescriptor],
        auth: &AuthContext,
    ) -> usize {
        let batches: Vec<&[EndpointDescriptor]> = endpoints.chunks(self.batch_size).collect();
        let cnpj = ctx.cnpj.clone();

        tracing::info!(
            cnpj = %cnpj,
            endpoints = endpoints.len(),
            batches = batches.len(),
            "Dispatching search"
        );

        for (index, batch) in batches.iter().enumerate() {
            if ctx.deadline_expired() {
                tracing::warn!(batch = index + 1, "Search deadline passed, abandoning batch");
                for endpoint in batch.iter() {
                    ctx.record(endpoint, RawSearchResult::failure(endpoint, DEADLINE_EXCEEDED));
                }
                continue;
            }

            tracing::debug!(batch = index + 1, size = batch.len(), "Starting batch");
            let deadline = ctx.deadline;
            let calls = batch.iter().map(|endpoint| {
                let cnpj = &cnpj;
                async move {
                    let search = self.client.search(endpoint, cnpj, auth);
                    match deadline {
                        Some(at) => tokio::time::timeout_at(at, search)
                            .await
                            .unwrap_or_else(|_| RawSearchResult::failure(endpoint, DEADLINE_EXCEEDED)),
                        None => search.await,
                    }
                }
            });
            let settled = join_all(calls).await;

            // join_all preserves input order, so assembly is independent of
            // completion order.
            for (endpoint, result) in batch.iter().zip(settled) {
                ctx.record(endpoint, result);
            }
            ctx.batches += 1;

            // Nothing left to pace once the deadline has passed
            if index + 1 < batches.len() && !ctx.deadline_expired() {
                ctx.pacing_delays += 1;
                let wake = Instant::now() + self.pacing_delay;
                let wake = ctx.deadline.map_or(wake, |at| at.min(wake));
                tokio::time::sleep_until(wake).await;
            }
        }

        batches.len()
    }

    /// One-shot dispatch over a single endpoint set
    pub async fn run(
        &self,
        cnpj: Cnpj,
        endpoints: &[EndpointDescriptor],
        auth: &AuthContext,
    ) -> MergedSearchResult {
        let tier = endpoints
            .iter()
            .map(|e| e.tier)
            .max()
            .unwrap_or(AuthTier::Anonymous);
        let mut ctx = SearchContext::new(cnpj);
        self.dispatch(&mut ctx, endpoints, auth).await;
        ctx.into_merged(tier, tier)
    }
}
