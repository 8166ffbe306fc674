//! Error types for the search pipeline
//!
//! Input and configuration problems surface as [`SearchError`] before any
//! network call is made. Failures of an individual endpoint are captured as
//! [`TransportError`] values inside the per-endpoint result and never abort a
//! search. Credential exchange failures are [`AuthError`] and only degrade the
//! tier that was being escalated to.

use std::time::Duration;

use thiserror::Error;

/// Crate-level error for everything that stops a search before dispatch
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid CNPJ: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Missing credential field '{field}' for {tier} search")]
    MissingCredential { tier: String, field: String },

    #[error("No endpoints selected for {0}")]
    NoEndpoints(String),

    #[error("Duplicate endpoint id in catalog: {0}")]
    DuplicateEndpoint(String),

    #[error("Invalid endpoint '{id}': {reason}")]
    InvalidEndpoint { id: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog parse error: {0}")]
    Catalog(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single request to a single endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Client setup failed: {0}")]
    Client(String),
}

/// Failure of a credential exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Credentials rejected: {0}")]
    Rejected(String),

    #[error("Authentication transport failure: {0}")]
    Transport(String),

    #[error("Authentication response missing token")]
    MissingToken,

    #[error("Invalid client certificate: {0}")]
    InvalidCertificate(String),

    #[error("Authentication token expired")]
    Expired,

    #[error("Search deadline exceeded before credential exchange completed")]
    DeadlineExceeded,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(Duration::ZERO)
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
