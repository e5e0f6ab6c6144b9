//! Configuration management for Askgate
//!
//! Configuration is loaded once from environment variables at startup and
//! shared read-only for the life of the process.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::provider::ProviderId;

/// Default primary endpoint (chat-completions API)
pub const DEFAULT_PRIMARY_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default system prompt for chat-completion providers
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for quality assurance and compliance topics.";

/// Default upstream timeout in milliseconds
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 9_000;

/// Default cap on forwarded context, in characters
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 6_000;

/// Connection settings for one upstream provider
#[derive(Clone, Default)]
pub struct ProviderSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Provider used when a request carries no override
    pub default_provider: ProviderId,
    /// Chat-completions provider
    pub primary: ProviderSettings,
    /// Prompt/answer provider
    pub secondary: ProviderSettings,
    /// System message sent to chat-completion providers
    pub system_prompt: String,

    /// Bound on a single upstream call
    pub upstream_timeout: Duration,
    /// Context longer than this many characters is truncated
    pub max_context_chars: usize,

    /// Running in the production configuration
    pub production: bool,
    /// Expose diagnostic stacks even in production
    pub debug_error_details: bool,

    /// Append-only usage log file
    pub usage_log_path: Option<PathBuf>,
    /// JSON document set for knowledge search
    pub knowledge_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            default_provider: ProviderId::Primary,
            primary: ProviderSettings {
                api_url: Some(DEFAULT_PRIMARY_API_URL.to_string()),
                api_key: None,
                model: Some(crate::provider::primary::DEFAULT_MODEL.to_string()),
            },
            secondary: ProviderSettings::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            upstream_timeout: Duration::from_millis(DEFAULT_UPSTREAM_TIMEOUT_MS),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            production: false,
            debug_error_details: false,
            usage_log_path: None,
            knowledge_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let environment = var("APP_ENV").or_else(|| var("NODE_ENV")).unwrap_or_default();

        Ok(Self {
            host: var("ASKGATE_HOST").unwrap_or(defaults.host),
            port: var("ASKGATE_PORT")
                .map(|v| v.parse::<u16>())
                .transpose()
                .context("Invalid ASKGATE_PORT")?
                .unwrap_or(defaults.port),

            default_provider: var("PROVIDER")
                .map(|v| v.parse::<ProviderId>())
                .transpose()
                .context("Invalid PROVIDER")?
                .unwrap_or(defaults.default_provider),
            primary: ProviderSettings {
                api_url: var("PRIMARY_API_URL").or(defaults.primary.api_url),
                api_key: var("PRIMARY_API_KEY"),
                model: var("PRIMARY_MODEL").or(defaults.primary.model),
            },
            secondary: ProviderSettings {
                api_url: var("SECONDARY_API_URL"),
                api_key: var("SECONDARY_API_KEY"),
                model: var("SECONDARY_MODEL"),
            },
            system_prompt: var("SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),

            upstream_timeout: var("UPSTREAM_TIMEOUT_MS")
                .map(|v| v.parse::<u64>().map(Duration::from_millis))
                .transpose()
                .context("Invalid UPSTREAM_TIMEOUT_MS")?
                .unwrap_or(defaults.upstream_timeout),
            max_context_chars: var("MAX_CONTEXT_CHARS")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("Invalid MAX_CONTEXT_CHARS")?
                .unwrap_or(defaults.max_context_chars),

            production: environment.eq_ignore_ascii_case("production"),
            debug_error_details: var("DEBUG_ERROR_DETAILS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            usage_log_path: var("USAGE_LOG_PATH").map(PathBuf::from),
            knowledge_path: var("KNOWLEDGE_PATH").map(PathBuf::from),
        })
    }

    /// Whether failure envelopes may carry diagnostic stacks
    pub fn expose_diagnostics(&self) -> bool {
        self.debug_error_details || !self.production
    }
}
