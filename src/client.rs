//! Endpoint search client
//!
//! Issues exactly one request to one endpoint and turns whatever comes back
//! into a [`RawSearchResult`]. Failures are data here: the caller always gets
//! a result, with `error` set when anything went wrong.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::EndpointDescriptor;
use crate::cnpj::Cnpj;
use crate::config::SearchConfig;
use crate::envelope::normalizer_for;
use crate::error::TransportError;
use crate::query::build_query;
use crate::transport::{AuthContext, SearchTransport, TransportRequest};
use crate::types::RawSearchResult;

pub struct EndpointSearchClient {
    transport: Arc<dyn SearchTransport>,
    request_timeout: Duration,
    page_size: usize,
}

impl EndpointSearchClient {
    pub fn new(transport: Arc<dyn SearchTransport>, config: &SearchConfig) -> Self {
        Self {
            transport,
            request_timeout: config.request_timeout,
            page_size: config.page_size,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Query one endpoint; never fails
    pub async fn search(
        &self,
        endpoint: &EndpointDescriptor,
        cnpj: &Cnpj,
        auth: &AuthContext,
    ) -> RawSearchResult {
        tracing::debug!(endpoint = %endpoint.id, "Searching in {}", endpoint.name);

        match self.try_search(endpoint, cnpj, auth).await {
            Ok(result) => {
                tracing::debug!(
                    endpoint = %endpoint.id,
                    total = result.total,
                    items = result.items.len(),
                    "Endpoint search complete"
                );
                result
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint.id, error = %e, "Error searching in {}", endpoint.name);
                RawSearchResult::failure(endpoint, e.to_string())
            }
        }
    }

    async fn try_search(
        &self,
        endpoint: &EndpointDescriptor,
        cnpj: &Cnpj,
        auth: &AuthContext,
    ) -> Result<RawSearchResult, TransportError> {
        let request = TransportRequest {
            endpoint_id: endpoint.id.clone(),
            method: endpoint.method,
            url: endpoint.url.clone(),
            query: build_query(cnpj, endpoint, self.page_size),
            timeout: self.request_timeout,
            auth: auth.clone(),
        };

        // The transport applies its own timeout too; this one also bounds
        // transports that ignore it.
        let body = tokio::time::timeout(self.request_timeout, self.transport.send(request))
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))??;

        let envelope = normalizer_for(endpoint.envelope).normalize(&body, &endpoint.id)?;
        Ok(RawSearchResult::success(
            endpoint,
            envelope.total,
            envelope.items,
        ))
    }
}
