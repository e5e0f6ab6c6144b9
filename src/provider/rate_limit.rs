//! Rate-limit hints from upstream response headers
//!
//! `retry-after` is read for every provider; the limit/remaining/reset
//! header names differ per provider and live in [`RATE_LIMIT_HEADERS`].

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;

use super::ProviderId;

/// Provider-specific rate-limit header names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: &'static str,
    pub remaining: &'static str,
    pub reset: &'static str,
}

/// Header table keyed by provider
pub const RATE_LIMIT_HEADERS: [(ProviderId, RateLimitHeaders); 2] = [
    (
        ProviderId::Primary,
        RateLimitHeaders {
            limit: "x-ratelimit-limit-requests",
            remaining: "x-ratelimit-remaining-requests",
            reset: "x-ratelimit-reset-requests",
        },
    ),
    (
        ProviderId::Secondary,
        RateLimitHeaders {
            limit: "x-ratelimit-limit",
            remaining: "x-ratelimit-remaining",
            reset: "x-ratelimit-reset",
        },
    ),
];

/// Header names for a provider
pub fn headers_for(provider: ProviderId) -> &'static RateLimitHeaders {
    RATE_LIMIT_HEADERS
        .iter()
        .find(|(id, _)| *id == provider)
        .map(|(_, headers)| headers)
        .unwrap_or(&RATE_LIMIT_HEADERS[0].1)
}

/// Backoff information surfaced to callers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    /// Seconds to wait before retrying
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<String>,
}

impl RateLimit {
    /// Collect whatever rate-limit headers are present; `None` if there are none
    pub fn from_headers(provider: ProviderId, headers: &HeaderMap) -> Option<Self> {
        let names = headers_for(provider);

        let rate_limit = Self {
            retry_after: header_str(headers, RETRY_AFTER.as_str()).and_then(parse_retry_after),
            limit: header_str(headers, names.limit).map(str::to_string),
            remaining: header_str(headers, names.remaining).map(str::to_string),
            reset: header_str(headers, names.reset).map(str::to_string),
        };

        (!rate_limit.is_empty()).then_some(rate_limit)
    }

    pub fn is_empty(&self) -> bool {
        self.retry_after.is_none()
            && self.limit.is_none()
            && self.remaining.is_none()
            && self.reset.is_none()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// `Retry-After` as whole seconds: delay-seconds (fractions rounded up) or an HTTP date
fn parse_retry_after(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return (seconds.is_finite() && seconds >= 0.0).then(|| seconds.ceil() as u64);
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).num_seconds().max(0) as u64)
}
