//! Provider registry and adapters
//!
//! The gateway talks to exactly two upstream LLM providers. Each one is
//! described by a [`ProviderAdapter`] that knows the provider's endpoint,
//! credentials, request shape, answer extraction and error extraction.
//! Provider-specific behavior is selected by [`ProviderId`], never by
//! matching strings in the request flow.

pub mod primary;
pub mod rate_limit;
pub mod secondary;

use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{Config, ProviderSettings};
use crate::error::{hint_for_status, GatewayError};
use crate::gateway::normalize::MAX_DIAGNOSTIC_CHARS;
use crate::gateway::request::{truncate_chars, Query};
use crate::proxy::headers;

pub use rate_limit::RateLimit;

/// Identifier of an upstream provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderId {
    Primary,
    Secondary,
}

impl ProviderId {
    /// Every known provider, in registry order
    pub const ALL: [ProviderId; 2] = [ProviderId::Primary, ProviderId::Secondary];

    /// Wire name, also used as the prefix of error codes and env vars
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Primary => "PRIMARY",
            ProviderId::Secondary => "SECONDARY",
        }
    }

    /// Environment variable holding the endpoint URL
    pub const fn url_var(&self) -> &'static str {
        match self {
            ProviderId::Primary => "PRIMARY_API_URL",
            ProviderId::Secondary => "SECONDARY_API_URL",
        }
    }

    /// Environment variable holding the API key
    pub const fn key_var(&self) -> &'static str {
        match self {
            ProviderId::Primary => "PRIMARY_API_KEY",
            ProviderId::Secondary => "SECONDARY_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider '{0}' (expected PRIMARY or SECONDARY)")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(ProviderId::Primary),
            "SECONDARY" => Ok(ProviderId::Secondary),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

/// Why a provider could not be registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    /// Required variables that are unset or blank
    Missing(Vec<&'static str>),
    /// The API key cannot be sent as an HTTP header value
    InvalidSecret(&'static str),
}

/// Provider-reported failure, extracted from a non-success response
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub hint: String,
    pub rate_limit: Option<RateLimit>,
    pub details: Option<Value>,
}

/// Immutable translation layer between the gateway and one provider
#[derive(Clone)]
pub struct ProviderAdapter {
    id: ProviderId,
    endpoint: String,
    auth: HeaderValue,
    model: Option<String>,
    system_prompt: String,
}

impl fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ProviderAdapter {
    /// Build an adapter, validating that the key is usable as a bearer token
    pub fn new(
        id: ProviderId,
        endpoint: impl Into<String>,
        api_key: &str,
        model: Option<String>,
        system_prompt: impl Into<String>,
    ) -> Result<Self, ConfigProblem> {
        let auth = headers::bearer(api_key).map_err(|_| ConfigProblem::InvalidSecret(id.key_var()))?;

        Ok(Self {
            id,
            endpoint: endpoint.into(),
            auth,
            model,
            system_prompt: system_prompt.into(),
        })
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model configured for this provider, if any
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Headers sent with every upstream call
    pub fn request_headers(&self) -> HeaderMap {
        headers::build_upstream_headers(&self.auth)
    }

    /// Provider-specific request body for a validated query
    pub fn build_request(&self, query: &Query) -> Value {
        match self.id {
            ProviderId::Primary => {
                primary::build_request(self.model.as_deref(), &self.system_prompt, query)
            }
            ProviderId::Secondary => secondary::build_request(self.model.as_deref(), query),
        }
    }

    /// Answer text from a successful response
    ///
    /// Both wire shapes are accepted from either provider; the provider's own
    /// shape is tried first. Only the secondary provider treats a non-JSON
    /// body as the answer itself.
    pub fn extract_answer(&self, parsed: Option<&Value>, raw: &str) -> Option<String> {
        match (self.id, parsed) {
            (ProviderId::Primary, Some(body)) => {
                primary::extract_answer(body).or_else(|| secondary::extract_answer(body))
            }
            (ProviderId::Primary, None) => None,
            (ProviderId::Secondary, Some(body)) => {
                secondary::extract_answer(body).or_else(|| primary::extract_answer(body))
            }
            (ProviderId::Secondary, None) => {
                let text = raw.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }

    /// Model reported by the provider, falling back to the configured one
    pub fn response_model(&self, parsed: Option<&Value>) -> Option<String> {
        parsed
            .and_then(|body| body.get("model"))
            .and_then(Value::as_str)
            .filter(|model| !model.is_empty())
            .map(str::to_string)
            .or_else(|| self.model.clone())
    }

    /// Rate-limit hints carried by the response headers
    pub fn rate_limit(&self, headers: &HeaderMap) -> Option<RateLimit> {
        RateLimit::from_headers(self.id, headers)
    }

    /// Classify a non-success upstream response
    pub fn extract_error(
        &self,
        status: u16,
        parsed: Option<&Value>,
        raw: &str,
        headers: &HeaderMap,
    ) -> ErrorInfo {
        let error_field = parsed.and_then(|body| body.get("error"));

        let message = error_field
            .and_then(|error| match error {
                Value::String(message) => Some(message.as_str()),
                other => other.get("message").and_then(Value::as_str),
            })
            .or_else(|| parsed.and_then(|body| body.get("message")).and_then(Value::as_str))
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string)
            .or_else(|| {
                let raw = raw.trim();
                (!raw.is_empty()).then(|| truncate_chars(raw, MAX_DIAGNOSTIC_CHARS).to_string())
            })
            .unwrap_or_else(|| format!("Upstream {} error.", self.id));

        let code = error_field
            .and_then(|error| {
                ["code", "type"]
                    .iter()
                    .filter_map(|key| error.get(*key).and_then(Value::as_str))
                    .map(str::trim)
                    .find(|code| !code.is_empty())
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_ERROR", self.id));

        let details = match parsed {
            Some(body) if raw.chars().count() <= MAX_DIAGNOSTIC_CHARS => Some(body.clone()),
            _ if raw.trim().is_empty() => None,
            _ => Some(json!({ "raw": truncate_chars(raw, MAX_DIAGNOSTIC_CHARS) })),
        };

        ErrorInfo {
            code,
            message,
            hint: hint_for_status(status).to_string(),
            rate_limit: self.rate_limit(headers),
            details,
        }
    }
}

/// Read-only provider table, built once at startup
#[derive(Debug)]
pub struct ProviderRegistry {
    default_provider: ProviderId,
    primary: Result<ProviderAdapter, ConfigProblem>,
    secondary: Result<ProviderAdapter, ConfigProblem>,
}

impl ProviderRegistry {
    /// Register both providers from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_provider: config.default_provider,
            primary: register(ProviderId::Primary, &config.primary, &config.system_prompt),
            secondary: register(ProviderId::Secondary, &config.secondary, &config.system_prompt),
        }
    }

    pub fn default_provider(&self) -> ProviderId {
        self.default_provider
    }

    /// Resolve the adapter for a request
    ///
    /// A valid override wins over the process default. A provider whose
    /// configuration is incomplete is reported, never called.
    pub fn resolve(
        &self,
        provider_override: Option<ProviderId>,
    ) -> Result<&ProviderAdapter, GatewayError> {
        let provider = select_provider(provider_override, self.default_provider);

        match self.slot(provider) {
            Ok(adapter) => Ok(adapter),
            Err(ConfigProblem::Missing(missing)) => Err(GatewayError::MissingConfig {
                provider,
                missing: missing.clone(),
            }),
            Err(ConfigProblem::InvalidSecret(key)) => {
                Err(GatewayError::InvalidConfig { provider, key })
            }
        }
    }

    /// Adapter for a provider, if it is fully configured
    pub fn adapter(&self, provider: ProviderId) -> Option<&ProviderAdapter> {
        self.slot(provider).as_ref().ok()
    }

    pub fn is_configured(&self, provider: ProviderId) -> bool {
        self.adapter(provider).is_some()
    }

    fn slot(&self, provider: ProviderId) -> &Result<ProviderAdapter, ConfigProblem> {
        match provider {
            ProviderId::Primary => &self.primary,
            ProviderId::Secondary => &self.secondary,
        }
    }
}

/// Override first, process default otherwise
pub fn select_provider(provider_override: Option<ProviderId>, default: ProviderId) -> ProviderId {
    provider_override.unwrap_or(default)
}

fn register(
    id: ProviderId,
    settings: &ProviderSettings,
    system_prompt: &str,
) -> Result<ProviderAdapter, ConfigProblem> {
    let url = non_blank(settings.api_url.as_deref());
    let key = non_blank(settings.api_key.as_deref());

    match (url, key) {
        (Some(url), Some(key)) => {
            ProviderAdapter::new(id, url, key, settings.model.clone(), system_prompt)
        }
        (url, key) => {
            let mut missing = Vec::new();
            if url.is_none() {
                missing.push(id.url_var());
            }
            if key.is_none() {
                missing.push(id.key_var());
            }
            Err(ConfigProblem::Missing(missing))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
