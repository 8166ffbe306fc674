//! CNPJ process search
//!
//! Looks up legal proceedings involving a Brazilian company across court
//! registries. Endpoints are queried in paced concurrent batches, escalating
//! through authentication tiers, and the hits are merged into a single
//! summary report.
//!
//! ## Pipeline
//! Request -> Orchestrator -> Dispatcher (per tier) -> Client -> Transport
//! -> Merged result -> Aggregator -> Summary report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cnpj_process_search::{
//!     AuthTier, BatchedDispatcher, Catalog, HttpCredentialProvider, HttpTransport,
//!     SearchConfig, SearchRequest, TieredOrchestrator,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SearchConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
//! let provider = Arc::new(HttpCredentialProvider::new(config.login_url.clone())?);
//! let dispatcher = Arc::new(BatchedDispatcher::new(transport, &config));
//! let orchestrator =
//!     TieredOrchestrator::new(dispatcher, Arc::new(Catalog::builtin()), provider, &config);
//!
//! let outcome = orchestrator
//!     .run_search(SearchRequest::new("08.049.394/0001-84", AuthTier::Anonymous))
//!     .await?;
//! println!("{} items", outcome.report.total_items);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Identifier and endpoint descriptions
pub mod catalog;
pub mod cnpj;
pub mod query;

// Wire boundary
pub mod credentials;
pub mod envelope;
pub mod transport;

// Search pipeline
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod orchestrator;
pub mod tier;
pub mod types;

// Reporting
pub mod aggregator;

pub use aggregator::{Aggregator, SummaryReport};
pub use catalog::{AuthTier, Catalog, Category, EndpointDescriptor};
pub use client::EndpointSearchClient;
pub use cnpj::Cnpj;
pub use config::SearchConfig;
pub use credentials::{
    ClientCertificate, CredentialProvider, HttpCredentialProvider, LicenseCredential,
    TierCredentials,
};
pub use dispatcher::{BatchedDispatcher, SearchContext};
pub use error::{AuthError, Result, SearchError, TransportError};
pub use orchestrator::{SearchOutcome, SearchRequest, TierCapabilities, TieredOrchestrator};
pub use transport::{AuthContext, HttpTransport, SearchTransport};
pub use types::{MergedSearchResult, RawSearchResult};
