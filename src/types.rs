//! Search result types shared by the dispatcher, orchestrator and aggregator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{AuthTier, Category, EndpointDescriptor};
use crate::envelope::RawItem;

/// Outcome of querying one endpoint once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResult {
    pub endpoint_id: String,
    pub endpoint_name: String,
    pub category: Category,
    pub tier: AuthTier,
    /// Declared total hits (may exceed `items.len()` when paged)
    pub total: u64,
    pub items: Vec<RawItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RawSearchResult {
    pub fn success(endpoint: &EndpointDescriptor, total: u64, items: Vec<RawItem>) -> Self {
        Self {
            endpoint_id: endpoint.id.clone(),
            endpoint_name: endpoint.name.clone(),
            category: endpoint.category,
            tier: endpoint.tier,
            total,
            items,
            error: None,
        }
    }

    /// Failure entry: zero total, no items, message preserved
    pub fn failure(endpoint: &EndpointDescriptor, message: impl Into<String>) -> Self {
        Self {
            endpoint_id: endpoint.id.clone(),
            endpoint_name: endpoint.name.clone(),
            category: endpoint.category,
            tier: endpoint.tier,
            total: 0,
            items: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Endpoint-level error, surfaced verbatim to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointError {
    pub endpoint_id: String,
    pub endpoint_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl EndpointError {
    pub fn from_result(result: &RawSearchResult) -> Option<Self> {
        result.error.as_ref().map(|message| Self {
            endpoint_id: result.endpoint_id.clone(),
            endpoint_name: result.endpoint_name.clone(),
            message: message.clone(),
            timestamp: Utc::now(),
        })
    }
}

/// A tier that could not be reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierError {
    pub tier: AuthTier,
    pub message: String,
}

/// Heuristic data quality label picked by tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Basic,
    Detailed,
    Complete,
}

/// Everything gathered by one search invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedSearchResult {
    pub search_id: Uuid,
    /// Punctuated CNPJ
    pub cnpj: String,
    pub searched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_filter: Option<Category>,
    pub requested_tier: AuthTier,
    pub tier_reached: AuthTier,
    pub endpoints_attempted: usize,
    pub endpoints_succeeded: usize,
    pub total_items: u64,
    pub results: Vec<RawSearchResult>,
    pub errors: Vec<EndpointError>,
    #[serde(default)]
    pub tier_errors: Vec<TierError>,
    #[serde(default)]
    pub enhanced_features: Vec<String>,
    /// Approximate share of real-world records this tier surfaces
    pub coverage: String,
    pub data_quality: DataQuality,
    pub strategy: String,
    pub estimates_note: String,
}

impl MergedSearchResult {
    pub fn result(&self, endpoint_id: &str) -> Option<&RawSearchResult> {
        self.results.iter().find(|r| r.endpoint_id == endpoint_id)
    }

    /// True when at least one endpoint or tier failed
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty() || !self.tier_errors.is_empty()
    }
}
