//! Tiered search orchestrator
//!
//! Runs the anonymous tier first, then escalates one tier at a time up to the
//! requested one. Each higher tier needs a successful credential exchange; a
//! failed exchange is recorded and stops escalation, but results already
//! gathered are still returned.

use std::sync::Arc;

use serde::Serialize;

use crate::aggregator::{Aggregator, SummaryReport};
use crate::catalog::{AuthTier, Catalog, Category, EndpointDescriptor};
use crate::cnpj::Cnpj;
use crate::config::SearchConfig;
use crate::credentials::{Credential, CredentialProvider, TierCredentials};
use crate::dispatcher::{BatchedDispatcher, SearchContext};
use crate::error::{AuthError, Result, SearchError};
use crate::tier::profile;
use crate::transport::AuthContext;
use crate::types::{DataQuality, MergedSearchResult};

/// One caller request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Raw identifier, punctuation allowed
    pub cnpj: String,
    pub tier: AuthTier,
    pub credentials: TierCredentials,
    /// Category name; `None` searches every category
    pub category: Option<String>,
}

impl SearchRequest {
    pub fn new(cnpj: impl Into<String>, tier: AuthTier) -> Self {
        Self {
            cnpj: cnpj.into(),
            tier,
            credentials: TierCredentials::none(),
            category: None,
        }
    }

    pub fn with_credentials(mut self, credentials: TierCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub merged: MergedSearchResult,
    pub report: SummaryReport,
}

/// What a tier offers, independent of any search
#[derive(Debug, Clone, Serialize)]
pub struct TierCapabilities {
    pub tier: AuthTier,
    pub strategy: String,
    pub coverage: String,
    pub data_quality: DataQuality,
    pub data_points: Vec<String>,
    /// Endpoints reachable at this tier, lower tiers included
    pub endpoints: usize,
}

pub struct TieredOrchestrator {
    dispatcher: Arc<BatchedDispatcher>,
    catalog: Arc<Catalog>,
    provider: Arc<dyn CredentialProvider>,
    aggregator: Aggregator,
    api_key: Option<String>,
    search_deadline: Option<std::time::Duration>,
}

impl TieredOrchestrator {
    pub fn new(
        dispatcher: Arc<BatchedDispatcher>,
        catalog: Arc<Catalog>,
        provider: Arc<dyn CredentialProvider>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            dispatcher,
            catalog,
            provider,
            aggregator: Aggregator::new(config.recent_events),
            api_key: config.api_key.clone(),
            search_deadline: config.search_deadline,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn run_search(&self, request: SearchRequest) -> Result<SearchOutcome> {
        let cnpj = Cnpj::parse(&request.cnpj)?;
        request.credentials.validate_for(request.tier)?;
        let category = request
            .category
            .as_deref()
            .map(Category::parse)
            .transpose()?;

        let selection = self.select(request.tier, category);
        if selection.iter().all(|(_, endpoints)| endpoints.is_empty()) {
            let scope = match category {
                Some(c) => format!("{} search in category {}", request.tier, c),
                None => format!("{} search", request.tier),
            };
            return Err(SearchError::NoEndpoints(scope));
        }

        tracing::info!(
            cnpj = %cnpj,
            tier = %request.tier,
            category = category.map(|c| c.as_str()).unwrap_or("all"),
            "Starting tiered search"
        );

        let mut ctx = SearchContext::new(cnpj).with_category_filter(category);
        if let Some(budget) = self.search_deadline {
            ctx = ctx.with_deadline(budget);
        }

        let mut tier_reached = AuthTier::Anonymous;
        for (tier, endpoints) in &selection {
            // A tier only counts as reached if its exchange settles in time
            let exchange = if ctx.deadline_expired() {
                Err(AuthError::DeadlineExceeded)
            } else {
                let authorize = self.authorize(*tier, &request.credentials);
                match ctx.deadline() {
                    Some(at) => tokio::time::timeout_at(at, authorize)
                        .await
                        .unwrap_or(Err(AuthError::DeadlineExceeded)),
                    None => authorize.await,
                }
            };
            let auth = match exchange {
                Ok(auth) => auth,
                Err(e) => {
                    tracing::warn!(tier = %tier, error = %e, "Credential exchange failed, stopping escalation");
                    ctx.record_tier_error(*tier, e.to_string());
                    break;
                }
            };
            if !endpoints.is_empty() {
                self.dispatcher.dispatch(&mut ctx, endpoints, &auth).await;
            }
            tier_reached = *tier;
        }

        let merged = ctx.into_merged(request.tier, tier_reached);
        let report = self.aggregator.aggregate(&merged);

        tracing::info!(
            search_id = %merged.search_id,
            tier_reached = %merged.tier_reached,
            attempted = merged.endpoints_attempted,
            succeeded = merged.endpoints_succeeded,
            total_items = merged.total_items,
            "Search complete"
        );

        Ok(SearchOutcome { merged, report })
    }

    pub async fn run_search_in_category(
        &self,
        cnpj: &str,
        tier: AuthTier,
        category: &str,
        credentials: TierCredentials,
    ) -> Result<SearchOutcome> {
        self.run_search(
            SearchRequest::new(cnpj, tier)
                .with_credentials(credentials)
                .with_category(category),
        )
        .await
    }

    pub fn capabilities(&self, tier: AuthTier) -> TierCapabilities {
        let p = profile(tier);
        TierCapabilities {
            tier,
            strategy: p.strategy.to_string(),
            coverage: p.coverage.to_string(),
            data_quality: p.data_quality,
            data_points: p.data_points.iter().map(|d| d.to_string()).collect(),
            endpoints: self.catalog.for_tier(tier).len(),
        }
    }

    /// Endpoints added by each tier from anonymous up to `requested`
    fn select(
        &self,
        requested: AuthTier,
        category: Option<Category>,
    ) -> Vec<(AuthTier, Vec<EndpointDescriptor>)> {
        AuthTier::ALL
            .iter()
            .filter(|t| **t <= requested)
            .map(|&tier| {
                let endpoints = self
                    .catalog
                    .tier_only(tier)
                    .into_iter()
                    .filter(|e| category.map_or(true, |c| e.category == c))
                    .collect();
                (tier, endpoints)
            })
            .collect()
    }

    async fn authorize(
        &self,
        tier: AuthTier,
        credentials: &TierCredentials,
    ) -> std::result::Result<AuthContext, AuthError> {
        match tier {
            AuthTier::Anonymous => Ok(AuthContext::anonymous(self.api_key.clone())),
            AuthTier::Credentialed => {
                let license = credentials.license.as_ref().ok_or_else(|| {
                    AuthError::Rejected("no license credential supplied".to_string())
                })?;
                let token = self
                    .provider
                    .authenticate(Credential::License(license))
                    .await?;
                if token.is_expired() {
                    return Err(AuthError::Expired);
                }
                Ok(AuthContext::Bearer {
                    token: token.token,
                    license: license.clone(),
                })
            }
            AuthTier::Certificated => {
                let certificate = credentials.certificate.as_ref().ok_or_else(|| {
                    AuthError::InvalidCertificate("no certificate supplied".to_string())
                })?;
                let token = self
                    .provider
                    .authenticate(Credential::Certificate(certificate))
                    .await?;
                if token.is_expired() {
                    return Err(AuthError::Expired);
                }
                Ok(AuthContext::Certificate {
                    token: token.token,
                    certificate: certificate.clone(),
                })
            }
        }
    }
}
