//! Credential exchange
//!
//! The credentialed tier needs an OAB (bar association) license triple; the
//! certificated tier additionally needs a client certificate. Both are
//! exchanged for an opaque token before any tier-specific endpoint is
//! contacted. The orchestrator only cares whether the exchange succeeded.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::catalog::AuthTier;
use crate::error::{AuthError, Result, SearchError};

const SESSION_DURATION_SECS: i64 = 3600;
const LOGIN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOGIN_URL: &str = "https://pje.tjsp.jus.br/pje/login";

// =============================================================================
// Credential types
// =============================================================================

/// OAB license credential: number, issuing state and password
#[derive(Clone, PartialEq, Eq)]
pub struct LicenseCredential {
    pub number: String,
    pub jurisdiction: String,
    pub secret: String,
}

impl LicenseCredential {
    pub fn new(
        number: impl Into<String>,
        jurisdiction: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            jurisdiction: jurisdiction.into(),
            secret: secret.into(),
        }
    }

    /// All three fields present; jurisdiction is a two-letter state code
    pub fn validate(&self, tier: AuthTier) -> Result<()> {
        let missing = |field: &str| SearchError::MissingCredential {
            tier: tier.to_string(),
            field: field.to_string(),
        };
        if self.number.trim().is_empty() {
            return Err(missing("oab_number"));
        }
        let state = self.jurisdiction.trim();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(missing("oab_state"));
        }
        if self.secret.is_empty() {
            return Err(missing("oab_password"));
        }
        Ok(())
    }
}

impl LicenseCredential {
    /// Builds a license from whichever parts were supplied
    ///
    /// Returns `None` only when no part is present; absent parts stay empty so
    /// that [`LicenseCredential::validate`] names the missing one.
    pub fn from_parts(
        number: Option<String>,
        jurisdiction: Option<String>,
        secret: Option<String>,
    ) -> Option<Self> {
        if number.is_none() && jurisdiction.is_none() && secret.is_none() {
            return None;
        }
        Some(Self::new(
            number.unwrap_or_default(),
            jurisdiction.unwrap_or_default(),
            secret.unwrap_or_default(),
        ))
    }
}

impl std::fmt::Debug for LicenseCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseCredential")
            .field("number", &self.number)
            .field("jurisdiction", &self.jurisdiction)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Client certificate handle: a PEM bundle holding certificate and key
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub label: String,
    pem: Arc<Vec<u8>>,
}

impl ClientCertificate {
    pub fn from_pem(label: impl Into<String>, pem: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            pem: Arc::new(pem),
        }
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path)?;
        Ok(Self::from_pem(path.display().to_string(), pem))
    }

    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    /// SHA-256 of the PEM bytes, hex encoded
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.pem.as_slice()))
    }

    pub fn validate(&self, tier: AuthTier) -> Result<()> {
        if self.pem.is_empty() {
            return Err(SearchError::MissingCredential {
                tier: tier.to_string(),
                field: "certificate".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("label", &self.label)
            .field("pem_bytes", &self.pem.len())
            .finish()
    }
}

/// Credentials supplied with a search request
#[derive(Debug, Clone, Default)]
pub struct TierCredentials {
    pub license: Option<LicenseCredential>,
    pub certificate: Option<ClientCertificate>,
}

impl TierCredentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_license(mut self, license: LicenseCredential) -> Self {
        self.license = Some(license);
        self
    }

    pub fn with_certificate(mut self, certificate: ClientCertificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Checks that everything `tier` needs is present and well-formed
    pub fn validate_for(&self, tier: AuthTier) -> Result<()> {
        if tier >= AuthTier::Credentialed {
            match &self.license {
                Some(license) => license.validate(tier)?,
                None => {
                    return Err(SearchError::MissingCredential {
                        tier: tier.to_string(),
                        field: "oab_number".to_string(),
                    })
                }
            }
        }
        if tier >= AuthTier::Certificated {
            match &self.certificate {
                Some(certificate) => certificate.validate(tier)?,
                None => {
                    return Err(SearchError::MissingCredential {
                        tier: tier.to_string(),
                        field: "certificate".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// What gets exchanged for a token
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    License(&'a LicenseCredential),
    Certificate(&'a ClientCertificate),
}

/// Opaque token handed back by a successful exchange
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(SESSION_DURATION_SECS)),
        }
    }
}

impl AuthToken {
    pub fn with_expiry(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(expires_at),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// =============================================================================
// Provider trait
// =============================================================================

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn authenticate(&self, credential: Credential<'_>) -> std::result::Result<AuthToken, AuthError>;
}

/// Provider backed by the court system login endpoint
pub struct HttpCredentialProvider {
    http: Client,
    login_url: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

impl HttpCredentialProvider {
    pub fn new(login_url: impl Into<String>) -> std::result::Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(LOGIN_TIMEOUT_SECS))
            .use_rustls_tls()
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            login_url: login_url.into(),
        })
    }

    async fn login(&self, license: &LicenseCredential) -> std::result::Result<AuthToken, AuthError> {
        let response = self
            .http
            .post(&self.login_url)
            .json(&serde_json::json!({
                "username": license.number,
                "state": license.jurisdiction,
                "password": license.secret,
                "userType": "ADVOGADO",
            }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected(format!("login returned {status}")));
        }
        if !status.is_success() {
            return Err(AuthError::Transport(format!("login returned {status}")));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        body.token
            .filter(|t| !t.is_empty())
            .map(AuthToken::new)
            .ok_or(AuthError::MissingToken)
    }
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn authenticate(&self, credential: Credential<'_>) -> std::result::Result<AuthToken, AuthError> {
        match credential {
            Credential::License(license) => self.login(license).await,
            Credential::Certificate(certificate) => {
                reqwest::Identity::from_pem(certificate.pem())
                    .map_err(|e| AuthError::InvalidCertificate(e.to_string()))?;
                Ok(AuthToken::new(certificate.fingerprint()))
            }
        }
    }
}
