//! Askgate - question-answer gateway for LLM providers
//!
//! Accepts a question with optional context, forwards it to one of two
//! upstream language-model providers, and returns a single normalized
//! success or failure envelope carrying a correlation id.

pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod knowledge;
pub mod provider;
pub mod proxy;
pub mod routes;
pub mod usage;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

pub use crate::config::Config;
pub use crate::envelope::ResponseEnvelope;
pub use crate::gateway::Gateway;
pub use crate::knowledge::KnowledgeBase;
pub use crate::provider::ProviderId;
pub use crate::usage::UsageLogger;

/// Application state shared across all request handlers
#[derive(Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
    pub start_time: Instant,
    /// `/chat` request pipeline
    pub gateway: Gateway,
    /// Fire-and-forget usage log writer
    pub usage_logger: UsageLogger,
    /// Static document set for `/search`
    pub knowledge: KnowledgeBase,
}

impl AppState {
    /// Create a new application state
    ///
    /// Spawns the usage log writer, so this must run inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        // Initialize HTTP client with connection pooling; the per-call bound
        // is applied by the upstream invoker
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()
            .context("Failed to build HTTP client")?;

        let knowledge = match &config.knowledge_path {
            Some(path) => KnowledgeBase::load(path)?,
            None => KnowledgeBase::empty(),
        };

        let usage_logger = UsageLogger::new(config.usage_log_path.clone());
        let gateway = Gateway::new(config.clone(), http_client.clone(), usage_logger.clone());

        Ok(Self {
            config,
            http_client,
            start_time: Instant::now(),
            gateway,
            usage_logger,
            knowledge,
        })
    }
}
