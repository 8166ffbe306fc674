//! HTTP transport boundary
//!
//! The search client talks to registries through [`SearchTransport`], so the
//! fan-out logic can be exercised without a network. [`HttpTransport`] is the
//! reqwest implementation used in production.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::catalog::HttpMethod;
use crate::credentials::{ClientCertificate, LicenseCredential};
use crate::error::TransportError;
use crate::query::SearchQuery;

const ERROR_BODY_PREVIEW: usize = 200;

/// Authentication attached to one request
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Public tier, optionally with the DataJud API key
    Anonymous { api_key: Option<String> },
    /// License-gated tier
    Bearer {
        token: String,
        license: LicenseCredential,
    },
    /// Certificate tier; the transport presents the certificate during TLS
    Certificate {
        token: String,
        certificate: ClientCertificate,
    },
}

impl AuthContext {
    pub fn anonymous(api_key: Option<String>) -> Self {
        Self::Anonymous { api_key }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        match self {
            Self::Anonymous { api_key: Some(key) } => {
                headers.push(("Authorization".to_string(), format!("APIKey {key}")));
            }
            Self::Anonymous { api_key: None } => {}
            Self::Bearer { token, license } => {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
                headers.push(("X-OAB-Number".to_string(), license.number.clone()));
                headers.push(("X-OAB-State".to_string(), license.jurisdiction.clone()));
            }
            Self::Certificate { .. } => {
                headers.push(("X-Certificate-Auth".to_string(), "true".to_string()));
            }
        }
        headers
    }

    pub fn certificate(&self) -> Option<&ClientCertificate> {
        match self {
            Self::Certificate { certificate, .. } => Some(certificate),
            _ => None,
        }
    }
}

/// Everything needed to issue one search request
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub endpoint_id: String,
    pub method: HttpMethod,
    pub url: String,
    pub query: SearchQuery,
    pub timeout: Duration,
    pub auth: AuthContext,
}

#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Issue the request and return the decoded JSON body
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError>;
}

// =============================================================================
// reqwest implementation
// =============================================================================

/// rustls-backed transport; one extra client per client certificate
pub struct HttpTransport {
    client: Client,
    default_timeout: Duration,
    certificate_clients: Mutex<HashMap<String, Client>>,
}

impl HttpTransport {
    pub fn new(default_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(default_timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            default_timeout,
            certificate_clients: Mutex::new(HashMap::new()),
        })
    }

    fn client_for(&self, auth: &AuthContext) -> Result<Client, TransportError> {
        let Some(certificate) = auth.certificate() else {
            return Ok(self.client.clone());
        };

        let fingerprint = certificate.fingerprint();
        let mut cache = self
            .certificate_clients
            .lock()
            .map_err(|_| TransportError::Client("certificate client cache poisoned".to_string()))?;
        if let Some(client) = cache.get(&fingerprint) {
            return Ok(client.clone());
        }

        let identity = reqwest::Identity::from_pem(certificate.pem())
            .map_err(|e| TransportError::Client(format!("invalid client certificate: {e}")))?;
        let client = Client::builder()
            .timeout(self.default_timeout)
            .use_rustls_tls()
            .identity(identity)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        cache.insert(fingerprint, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
        let client = self.client_for(&request.auth)?;

        let mut builder = match (&request.method, &request.query) {
            (HttpMethod::Get, SearchQuery::Params(params)) => {
                let url = url::Url::parse_with_params(&request.url, params)
                    .map_err(|e| TransportError::Client(format!("invalid URL: {e}")))?;
                client.get(url)
            }
            (HttpMethod::Get, SearchQuery::Body(_)) => {
                return Err(TransportError::Client(format!(
                    "{}: GET cannot carry a JSON query body",
                    request.endpoint_id
                )));
            }
            (HttpMethod::Post, SearchQuery::Body(body)) => client.post(&request.url).json(body),
            (HttpMethod::Post, SearchQuery::Params(params)) => {
                client.post(&request.url).form(params)
            }
        };

        builder = builder.timeout(request.timeout);
        for (name, value) in request.auth.headers() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}
