//! Request normalizer
//!
//! Turns the raw inbound body into a validated [`Query`]. Non-string fields
//! are treated as absent; only a body that is not a JSON object is rejected
//! as malformed.

use serde_json::{Map, Value};

use crate::error::{GatewayError, GatewayResult};
use crate::provider::ProviderId;

/// Appended to context that was cut at the length cap
pub const TRUNCATION_MARKER: &str = "…";

/// Canonical, validated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Trimmed question text; never empty
    pub text: String,
    /// Context, possibly truncated
    pub context: String,
    pub provider_override: Option<ProviderId>,
}

/// Parse and validate an inbound body
///
/// An empty body is read as `{}`.
pub fn parse_query(body: &[u8], max_context_chars: usize) -> GatewayResult<Query> {
    let fields: Map<String, Value> = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        serde_json::from_slice(body).map_err(|source| GatewayError::InvalidBody {
            source,
            raw: String::from_utf8_lossy(body).into_owned(),
        })?
    };

    let text = string_field(&fields, "q").trim();
    if text.is_empty() {
        return Err(GatewayError::MissingQuery {
            received_keys: fields.keys().cloned().collect(),
        });
    }

    Ok(Query {
        text: text.to_string(),
        context: truncate_context(string_field(&fields, "context"), max_context_chars),
        provider_override: fields
            .get("providerOverride")
            .and_then(Value::as_str)
            .and_then(|value| value.parse::<ProviderId>().ok()),
    })
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a str {
    fields.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Cap context at `max_chars` characters, marking the cut
pub fn truncate_context(context: &str, max_chars: usize) -> String {
    let kept = truncate_chars(context, max_chars);
    if kept.len() == context.len() {
        return context.to_string();
    }

    let mut truncated = String::with_capacity(kept.len() + TRUNCATION_MARKER.len());
    truncated.push_str(kept);
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Longest prefix of at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
