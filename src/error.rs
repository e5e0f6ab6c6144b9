//! Error types for Askgate
//!
//! Every failure on the request path is a [`GatewayError`] until the gateway
//! converts it into the single failure envelope. Upstream rejections are not
//! errors here: the response normalizer builds their envelope directly.

use std::error::Error as StdError;

use axum::http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::envelope::Failure;
use crate::gateway::normalize::MAX_DIAGNOSTIC_CHARS;
use crate::gateway::request::truncate_chars;
use crate::provider::ProviderId;

/// Failure taxonomy used for logs and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed body or missing query; never retried
    Validation,
    /// Missing or unusable provider configuration; operator-actionable
    Configuration,
    /// Provider answered with a non-success status
    UpstreamRejected,
    /// Provider did not answer within the bound
    UpstreamTimeout,
    /// Provider could not be reached
    UpstreamUnreachable,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::UpstreamRejected => "upstream_rejected",
            ErrorCategory::UpstreamTimeout => "upstream_timeout",
            ErrorCategory::UpstreamUnreachable => "upstream_unreachable",
        }
    }
}

/// Gateway-level errors
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid JSON body.")]
    InvalidBody {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("Request body could not be read.")]
    UnreadableBody { status: StatusCode, reason: String },

    #[error("Missing \"q\" in request body.")]
    MissingQuery { received_keys: Vec<String> },

    #[error("{} not set.", .missing.join(" and "))]
    MissingConfig {
        provider: ProviderId,
        missing: Vec<&'static str>,
    },

    #[error("{key} is not a valid HTTP header value.")]
    InvalidConfig {
        provider: ProviderId,
        key: &'static str,
    },

    #[error("{provider} did not respond within {timeout_ms} ms.")]
    UpstreamTimeout {
        provider: ProviderId,
        endpoint: String,
        model: Option<String>,
        timeout_ms: u64,
    },

    #[error("Failed to reach {provider}.")]
    UpstreamUnreachable {
        provider: ProviderId,
        endpoint: String,
        model: Option<String>,
        #[source]
        source: reqwest::Error,
    },
}

impl GatewayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::InvalidBody { .. }
            | GatewayError::UnreadableBody { .. }
            | GatewayError::MissingQuery { .. } => ErrorCategory::Validation,
            GatewayError::MissingConfig { .. } | GatewayError::InvalidConfig { .. } => {
                ErrorCategory::Configuration
            }
            GatewayError::UpstreamTimeout { .. } => ErrorCategory::UpstreamTimeout,
            GatewayError::UpstreamUnreachable { .. } => ErrorCategory::UpstreamUnreachable,
        }
    }

    pub fn status(&self) -> StatusCode {
        if let GatewayError::UnreadableBody { status, .. } = self {
            return *status;
        }
        match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCategory::UpstreamUnreachable | ErrorCategory::UpstreamRejected => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> String {
        match self {
            GatewayError::InvalidBody { .. } => "BAD_REQUEST".to_string(),
            GatewayError::UnreadableBody { status, .. } => {
                if *status == StatusCode::PAYLOAD_TOO_LARGE {
                    "PAYLOAD_TOO_LARGE".to_string()
                } else {
                    "BAD_REQUEST".to_string()
                }
            }
            GatewayError::MissingQuery { .. } => "MISSING_QUERY".to_string(),
            GatewayError::MissingConfig { provider, .. } => format!("MISSING_{provider}_CONFIG"),
            GatewayError::InvalidConfig { provider, .. } => format!("INVALID_{provider}_CONFIG"),
            GatewayError::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT".to_string(),
            GatewayError::UpstreamUnreachable { provider, .. } => {
                format!("{provider}_NETWORK_ERROR")
            }
        }
    }

    /// Human-readable next step
    pub fn hint(&self) -> String {
        match self {
            GatewayError::InvalidBody { .. } => r#"Send a JSON body like {"q":"Hello"}"#.to_string(),
            GatewayError::UnreadableBody { .. } => {
                "Send a smaller JSON body; long context is truncated anyway.".to_string()
            }
            GatewayError::MissingQuery { .. } => {
                r#"Include a "q" property with your question."#.to_string()
            }
            GatewayError::MissingConfig { missing, .. } => {
                format!("Set {} in the gateway environment.", missing.join(" and "))
            }
            GatewayError::InvalidConfig { key, .. } => {
                format!("Check {key} for stray whitespace or control characters.")
            }
            GatewayError::UpstreamTimeout { .. } => {
                "Retry with a shorter context or a faster model.".to_string()
            }
            GatewayError::UpstreamUnreachable { .. } => {
                "Check network, DNS, or provider availability; retry with backoff.".to_string()
            }
        }
    }

    /// Provider the error is attributed to, when one was resolved
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            GatewayError::InvalidBody { .. }
            | GatewayError::UnreadableBody { .. }
            | GatewayError::MissingQuery { .. } => None,
            GatewayError::MissingConfig { provider, .. }
            | GatewayError::InvalidConfig { provider, .. }
            | GatewayError::UpstreamTimeout { provider, .. }
            | GatewayError::UpstreamUnreachable { provider, .. } => Some(*provider),
        }
    }

    /// Error chain rendered one cause per line
    pub fn stack(&self) -> Option<String> {
        let mut lines = Vec::new();
        let mut cause = self.source();
        while let Some(err) = cause {
            lines.push(format!("caused by: {err}"));
            cause = err.source();
        }
        if lines.is_empty() {
            return None;
        }
        lines.insert(0, self.to_string());
        Some(lines.join("\n"))
    }

    /// Convert into the failure envelope body
    ///
    /// `fallback_provider` is reported when the request never got as far as
    /// resolving one.
    pub fn into_failure(self, cid: &str, fallback_provider: ProviderId) -> Failure {
        let failure = Failure::new(
            self.status().as_u16(),
            self.code(),
            self.to_string(),
            self.provider().unwrap_or(fallback_provider),
            cid,
        )
        .with_hint(self.hint());

        let failure = match self.stack() {
            Some(stack) => failure.with_stack(stack),
            None => failure,
        };

        match self {
            GatewayError::InvalidBody { raw, .. } => failure.with_details(json!({
                "raw": truncate_chars(&raw, MAX_DIAGNOSTIC_CHARS),
            })),
            GatewayError::UnreadableBody { reason, .. } => {
                failure.with_details(json!({ "reason": reason }))
            }
            GatewayError::MissingQuery { received_keys } => {
                failure.with_details(json!({ "receivedKeys": received_keys }))
            }
            GatewayError::MissingConfig { missing, .. } => {
                failure.with_details(json!({ "missing": missing }))
            }
            GatewayError::InvalidConfig { .. } => failure,
            GatewayError::UpstreamTimeout {
                endpoint,
                model,
                timeout_ms,
                ..
            } => failure
                .with_endpoint(endpoint)
                .with_model(model)
                .with_details(json!({ "timeoutMs": timeout_ms })),
            GatewayError::UpstreamUnreachable {
                endpoint,
                model,
                source,
                ..
            } => failure
                .with_endpoint(endpoint)
                .with_model(model)
                .with_details(json!({ "error": source.to_string() })),
        }
    }
}

/// Hint for an upstream HTTP status, independent of provider
pub fn hint_for_status(status: u16) -> &'static str {
    match status {
        401 => "Verify the provider API key; it is missing, invalid, or revoked.",
        404 => "The model or endpoint was not found; verify the configured model name and API URL.",
        429 => "The provider is rate limiting requests; wait for rateLimit.retryAfter seconds before retrying.",
        s if s >= 500 => "The provider had a server-side failure; retry with exponential backoff.",
        _ => "Check the request payload and provider settings.",
    }
}

/// Result type alias for convenience
pub type GatewayResult<T> = Result<T, GatewayError>;
