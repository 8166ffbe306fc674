//! Shared test fixtures: scripted transport and credential provider

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;

use cnpj_process_search::catalog::{AuthTier, Catalog, Category, EndpointDescriptor};
use cnpj_process_search::credentials::{AuthToken, Credential, CredentialProvider};
use cnpj_process_search::error::{AuthError, TransportError};
use cnpj_process_search::transport::{AuthContext, SearchTransport, TransportRequest};
use cnpj_process_search::{BatchedDispatcher, SearchConfig, TieredOrchestrator};

pub const VALID_CNPJ: &str = "08049394000184";

/// Canned reply for one endpoint
#[derive(Clone)]
pub enum Reply {
    Body(Value),
    Fail(TransportError),
    Delayed(Duration, Value),
    Hang,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint_id: String,
    pub at: Instant,
    pub auth: AuthContext,
}

/// In-memory transport; unscripted endpoints answer with zero hits
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, endpoint_id: &str, reply: Reply) -> Self {
        self.replies.insert(endpoint_id.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.endpoint_id).collect()
    }
}

#[async_trait]
impl SearchTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(Call {
            endpoint_id: request.endpoint_id.clone(),
            at: Instant::now(),
            auth: request.auth.clone(),
        });

        match self.replies.get(&request.endpoint_id).cloned() {
            None => Ok(hits(vec![])),
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Reply::Hang) => std::future::pending().await,
        }
    }
}

/// Credential provider with fixed answers per credential kind
pub struct ScriptedProvider {
    license: Result<AuthToken, AuthError>,
    certificate: Result<AuthToken, AuthError>,
    delay: Duration,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedProvider {
    pub fn accepting() -> Self {
        Self {
            license: Ok(AuthToken::new("license-token")),
            certificate: Ok(AuthToken::new("certificate-token")),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Accepts everything, but each exchange takes `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::accepting()
        }
    }

    pub fn expired_license() -> Self {
        Self {
            license: Ok(AuthToken::with_expiry(
                "stale-token",
                chrono::Utc::now() - chrono::Duration::minutes(5),
            )),
            ..Self::accepting()
        }
    }

    pub fn rejecting_license() -> Self {
        Self {
            license: Err(AuthError::Rejected("invalid OAB password".to_string())),
            ..Self::accepting()
        }
    }

    pub fn rejecting_certificate() -> Self {
        Self {
            certificate: Err(AuthError::InvalidCertificate("expired".to_string())),
            ..Self::accepting()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialProvider for ScriptedProvider {
    async fn authenticate(&self, credential: Credential<'_>) -> Result<AuthToken, AuthError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match credential {
            Credential::License(_) => {
                self.calls.lock().unwrap().push("license");
                self.license.clone()
            }
            Credential::Certificate(_) => {
                self.calls.lock().unwrap().push("certificate");
                self.certificate.clone()
            }
        }
    }
}

/// Search-hits envelope around the given `_source` documents
pub fn hits(sources: Vec<Value>) -> Value {
    let hits: Vec<Value> = sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| json!({ "_id": format!("hit-{i}"), "_score": 1.0, "_source": source }))
        .collect();
    json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } })
}

/// Process record filed on `date`
pub fn process(number: &str, date: &str, topic: &str, status: &str) -> Value {
    json!({
        "dadosBasicos": {
            "numeroProcesso": number,
            "dataAjuizamento": date,
            "assunto": [ { "nome": topic } ],
            "polo": [ { "polo": "PA", "pessoa": { "nome": "ACME LTDA", "documento": VALID_CNPJ } } ]
        },
        "movimentosNacionais": [ { "nome": "Distribuição", "dataHora": date }, { "nome": status } ]
    })
}

pub fn endpoint(id: &str, category: Category, tier: AuthTier) -> EndpointDescriptor {
    let mut endpoint = EndpointDescriptor::datajud(id, &id.to_uppercase(), category);
    endpoint.tier = tier;
    endpoint
}

/// Config with no pacing and a generous batch size
pub fn fast_config() -> SearchConfig {
    SearchConfig::default()
        .with_batch_size(10)
        .with_pacing_delay(Duration::ZERO)
}

pub fn orchestrator(
    catalog: Catalog,
    transport: Arc<ScriptedTransport>,
    provider: Arc<ScriptedProvider>,
    config: &SearchConfig,
) -> TieredOrchestrator {
    let dispatcher = Arc::new(BatchedDispatcher::new(transport, config));
    TieredOrchestrator::new(dispatcher, Arc::new(catalog), provider, config)
}
