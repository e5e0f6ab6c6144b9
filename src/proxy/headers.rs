//! Header utilities for upstream provider calls
//!
//! Client headers are never forwarded; every upstream request carries only
//! the headers built here.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE,
};

/// Header providers use to echo their own request id
pub const UPSTREAM_REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Bearer authorization value, marked sensitive so it never shows up in debug output
pub fn bearer(api_key: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Build the headers sent with every upstream request
pub fn build_upstream_headers(auth: &HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(AUTHORIZATION, auth.clone());
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    headers
}

/// Provider request id from a response, if present and non-empty
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(UPSTREAM_REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
