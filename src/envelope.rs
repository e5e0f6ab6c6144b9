//! Response envelope
//!
//! Every `/chat` response is exactly one of two shapes:
//!
//! - `{ ok: true, answer, provider, model?, cid, requestId? }`
//! - `{ ok: false, error: { code, message, status, provider, endpoint, requestId, when, cid, ... } }`

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::provider::{ProviderId, RateLimit};

/// Response header echoing the correlation id
pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Successful answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub answer: String,
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub cid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Normalized failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub code: String,
    pub message: String,
    pub status: u16,
    pub provider: ProviderId,
    pub endpoint: String,
    pub request_id: String,
    /// RFC 3339 UTC timestamp
    pub when: String,
    pub cid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl Failure {
    pub fn new(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
        provider: ProviderId,
        cid: &str,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            provider,
            endpoint: String::new(),
            request_id: String::new(),
            when: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            cid: cid.to_string(),
            model: None,
            hint: None,
            details: None,
            rate_limit: None,
            stack: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id.unwrap_or_default();
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.is_empty());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        self.hint = (!hint.is_empty()).then_some(hint);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimit>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY)
    }
}

/// The single outbound shape of the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Success(SuccessBody),
    Failure(Failure),
}

impl ResponseEnvelope {
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseEnvelope::Success(_) => StatusCode::OK,
            ResponseEnvelope::Failure(failure) => failure.status_code(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            ResponseEnvelope::Success(body) => &body.cid,
            ResponseEnvelope::Failure(failure) => &failure.cid,
        }
    }

    pub fn provider(&self) -> ProviderId {
        match self {
            ResponseEnvelope::Success(body) => body.provider,
            ResponseEnvelope::Failure(failure) => failure.provider,
        }
    }

    /// `"success"` or the failure code, for metrics labels
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success(_))
    }

    /// Drop diagnostic stacks unless they may be exposed
    pub fn redact_diagnostics(mut self, expose: bool) -> Self {
        if let ResponseEnvelope::Failure(failure) = &mut self {
            if !expose {
                failure.stack = None;
            }
        }
        self
    }
}

#[derive(Serialize)]
struct SuccessWire<'a> {
    ok: bool,
    #[serde(flatten)]
    body: &'a SuccessBody,
}

#[derive(Serialize)]
struct FailureWire<'a> {
    ok: bool,
    error: &'a Failure,
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResponseEnvelope::Success(body) => SuccessWire { ok: true, body }.serialize(serializer),
            ResponseEnvelope::Failure(error) => {
                FailureWire { ok: false, error }.serialize(serializer)
            }
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(self.correlation_id()) {
            headers.insert(CORRELATION_ID_HEADER, value);
        }

        if let ResponseEnvelope::Failure(failure) = &self {
            if let Some(retry_after) = failure.rate_limit.as_ref().and_then(|r| r.retry_after) {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            }
        }

        (status, headers, Json(self)).into_response()
    }
}
