//! Upstream call logging
//!
//! Structured log lines for one upstream call, all keyed by the request's
//! correlation id so a single question can be followed through the logs.

use std::time::Instant;
use tracing::{debug, error, info, warn, Span};

use crate::provider::ProviderId;

/// Context for tracking one request through its upstream call
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id of the inbound request
    pub correlation_id: String,
    /// When the call started
    pub start_time: Instant,
    /// Provider handling this request
    pub provider: ProviderId,
    /// Upstream endpoint being called
    pub endpoint: String,
    /// Model being used (if configured)
    pub model: Option<String>,
}

impl RequestContext {
    pub fn new(correlation_id: &str, provider: ProviderId, endpoint: &str) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            start_time: Instant::now(),
            provider,
            endpoint: endpoint.to_string(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model.map(str::to_string);
        self
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Log request initiation
    pub fn log_request_start(&self, context_chars: usize) {
        info!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            context_chars = %context_chars,
            "Request started"
        );
    }

    /// Log request being sent to upstream
    pub fn log_upstream_request(&self, body_size: usize) {
        debug!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            body_size = %body_size,
            "Sending request to upstream"
        );
    }

    /// Log response received from upstream
    pub fn log_upstream_response(&self, status: u16, body_size: usize) {
        info!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            status = %status,
            body_size = %body_size,
            elapsed_ms = %self.elapsed_ms(),
            "Response received from upstream"
        );
    }

    /// Log successful request completion
    pub fn log_request_complete(&self, answer_chars: usize) {
        info!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            answer_chars = %answer_chars,
            elapsed_ms = %self.elapsed_ms(),
            "Request completed successfully"
        );
    }

    /// Log a provider rejection
    pub fn log_error(&self, status: u16, code: &str) {
        warn!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            status = %status,
            code = %code,
            elapsed_ms = %self.elapsed_ms(),
            "Request failed"
        );
    }

    /// Log connection error
    pub fn log_connection_error(&self, error: &reqwest::Error) {
        error!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            elapsed_ms = %self.elapsed_ms(),
            connect = %error.is_connect(),
            error = %error,
            "Connection to upstream failed"
        );
    }

    /// Log timeout
    pub fn log_timeout(&self, timeout_ms: u64) {
        error!(
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            timeout_ms = %timeout_ms,
            elapsed_ms = %self.elapsed_ms(),
            "Upstream request timed out"
        );
    }

    /// Create a tracing span for this call
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "upstream_call",
            cid = %self.correlation_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
        )
    }
}
