//! Upstream invoker
//!
//! Performs exactly one POST per request against the resolved provider,
//! bounded by the configured timeout. The bound covers the whole exchange:
//! connecting, sending, and reading the response body.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::Instrument;

use super::headers;
use super::logging::RequestContext;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::request::Query;
use crate::provider::ProviderAdapter;
use crate::routes::metrics::record_upstream_status;

/// Whatever the provider sent back, before any interpretation
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub text: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as JSON, if it is JSON
    pub fn parsed(&self) -> Option<Value> {
        serde_json::from_str(&self.text).ok()
    }

    /// Provider request id from `x-request-id`
    pub fn request_id(&self) -> Option<String> {
        headers::request_id(&self.headers)
    }
}

/// Issues upstream calls over a shared HTTP client
#[derive(Debug, Clone)]
pub struct UpstreamInvoker {
    client: reqwest::Client,
    timeout: Duration,
}

impl UpstreamInvoker {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Send the query to the provider
    ///
    /// Any HTTP status, success or not, comes back as a [`RawResponse`].
    /// Only a timeout or a transport failure is an error.
    pub async fn invoke(
        &self,
        adapter: &ProviderAdapter,
        query: &Query,
        ctx: &RequestContext,
    ) -> GatewayResult<RawResponse> {
        let span = ctx.create_span();

        let body = adapter.build_request(query);
        let payload = body.to_string();
        ctx.log_upstream_request(payload.len());

        let exchange = async {
            let response = self
                .client
                .post(adapter.endpoint())
                .headers(adapter.request_headers())
                .body(payload)
                .send()
                .await?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let text = response.text().await?;

            Ok::<_, reqwest::Error>(RawResponse {
                status,
                headers,
                text,
            })
        };

        let timeout_ms = self.timeout.as_millis() as u64;

        match tokio::time::timeout(self.timeout, exchange.instrument(span)).await {
            Ok(Ok(raw)) => {
                ctx.log_upstream_response(raw.status, raw.text.len());
                record_upstream_status(adapter.id(), raw.status);
                Ok(raw)
            }
            Ok(Err(err)) if err.is_timeout() => {
                ctx.log_timeout(timeout_ms);
                Err(timeout_error(adapter, timeout_ms))
            }
            Ok(Err(err)) => {
                ctx.log_connection_error(&err);
                Err(GatewayError::UpstreamUnreachable {
                    provider: adapter.id(),
                    endpoint: adapter.endpoint().to_string(),
                    model: adapter.model().map(str::to_string),
                    source: err,
                })
            }
            Err(_elapsed) => {
                ctx.log_timeout(timeout_ms);
                Err(timeout_error(adapter, timeout_ms))
            }
        }
    }
}

fn timeout_error(adapter: &ProviderAdapter, timeout_ms: u64) -> GatewayError {
    GatewayError::UpstreamTimeout {
        provider: adapter.id(),
        endpoint: adapter.endpoint().to_string(),
        model: adapter.model().map(str::to_string),
        timeout_ms,
    }
}
