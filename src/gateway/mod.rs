//! Gateway handler
//!
//! Owns one request from receipt to response:
//!
//! `Received → Validated → ProviderResolved → UpstreamCalled → Normalized → Responded`
//!
//! Any stage may short-circuit to `Responded` with a failure. Whatever
//! happens, the caller gets exactly one [`ResponseEnvelope`] carrying the
//! correlation id assigned on receipt.

pub mod normalize;
pub mod request;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::envelope::ResponseEnvelope;
use crate::error::{ErrorCategory, GatewayError, GatewayResult};
use crate::provider::ProviderRegistry;
use crate::proxy::logging::RequestContext;
use crate::proxy::UpstreamInvoker;
use crate::routes::metrics::record_request;
use crate::usage::{UsageEntry, UsageLogger};

/// Pipeline stage, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    ProviderResolved,
    UpstreamCalled,
    Normalized,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::ProviderResolved => "provider_resolved",
            Stage::UpstreamCalled => "upstream_called",
            Stage::Normalized => "normalized",
            Stage::Responded => "responded",
        })
    }
}

/// Fresh correlation id
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Metrics label for a finished request
///
/// Upstream error codes are provider-chosen strings, so failures are
/// labelled by category only.
fn outcome_label(result: &GatewayResult<ResponseEnvelope>) -> &'static str {
    match result {
        Ok(ResponseEnvelope::Success(_)) => "success",
        Ok(ResponseEnvelope::Failure(_)) => ErrorCategory::UpstreamRejected.as_str(),
        Err(err) => err.category().as_str(),
    }
}

/// Request pipeline shared by all `/chat` handlers
#[derive(Debug)]
pub struct Gateway {
    config: Arc<Config>,
    registry: ProviderRegistry,
    invoker: UpstreamInvoker,
    usage: UsageLogger,
}

impl Gateway {
    pub fn new(config: Arc<Config>, http_client: reqwest::Client, usage: UsageLogger) -> Self {
        let registry = ProviderRegistry::from_config(&config);
        let invoker = UpstreamInvoker::new(http_client, config.upstream_timeout);

        Self {
            config,
            registry,
            invoker,
            usage,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Handle one inbound body under a new correlation id
    pub async fn handle(&self, body: &[u8]) -> ResponseEnvelope {
        self.handle_with_id(body, &new_correlation_id()).await
    }

    /// Handle one inbound body under the given correlation id
    #[tracing::instrument(name = "chat", skip_all, fields(cid = %cid))]
    pub async fn handle_with_id(&self, body: &[u8], cid: &str) -> ResponseEnvelope {
        let start = Instant::now();
        debug!(stage = %Stage::Received, body_size = body.len());

        let result = self.run(body, cid).await;
        self.respond(result, cid, start)
    }

    /// Failure envelope for a body the transport could not deliver
    pub fn reject(&self, err: GatewayError) -> ResponseEnvelope {
        let cid = new_correlation_id();
        let _span = tracing::info_span!("chat", cid = %cid).entered();
        debug!(stage = %Stage::Received, "Body rejected by transport");

        self.respond(Err(err), &cid, Instant::now())
    }

    fn respond(
        &self,
        result: GatewayResult<ResponseEnvelope>,
        cid: &str,
        start: Instant,
    ) -> ResponseEnvelope {
        let outcome = outcome_label(&result);
        let envelope = match result {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(
                    stage = %Stage::Responded,
                    category = err.category().as_str(),
                    code = %err.code(),
                    error = %err,
                    "Request short-circuited"
                );
                ResponseEnvelope::Failure(err.into_failure(cid, self.registry.default_provider()))
            }
        }
        .redact_diagnostics(self.config.expose_diagnostics());

        record_request(envelope.provider(), outcome, start.elapsed().as_secs_f64());
        debug!(stage = %Stage::Responded, status = envelope.status().as_u16());

        envelope
    }

    async fn run(&self, body: &[u8], cid: &str) -> GatewayResult<ResponseEnvelope> {
        let query = request::parse_query(body, self.config.max_context_chars)?;
        debug!(stage = %Stage::Validated, provider_override = ?query.provider_override);

        let adapter = self.registry.resolve(query.provider_override)?;
        debug!(stage = %Stage::ProviderResolved, provider = %adapter.id());

        let ctx = RequestContext::new(cid, adapter.id(), adapter.endpoint())
            .with_model(adapter.model());
        ctx.log_request_start(query.context.chars().count());

        let raw = self.invoker.invoke(adapter, &query, &ctx).await?;
        debug!(stage = %Stage::UpstreamCalled, status = raw.status);

        let envelope = normalize::normalize(adapter, &raw, cid);
        debug!(stage = %Stage::Normalized, ok = envelope.is_success());

        match &envelope {
            ResponseEnvelope::Success(success) => {
                ctx.log_request_complete(success.answer.chars().count());
                self.usage
                    .track(UsageEntry::answered(&query.text, &success.answer, cid));
            }
            ResponseEnvelope::Failure(failure) => ctx.log_error(failure.status, &failure.code),
        }

        Ok(envelope)
    }
}
