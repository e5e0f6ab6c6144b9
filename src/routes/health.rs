//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with provider configuration status
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::provider::{ProviderId, ProviderRegistry};
use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Configuration state of one provider
#[derive(Debug, Serialize)]
pub struct ProviderCheck {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub default_provider: ProviderId,
    pub providers: BTreeMap<&'static str, ProviderCheck>,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

fn provider_checks(registry: &ProviderRegistry) -> BTreeMap<&'static str, ProviderCheck> {
    ProviderId::ALL
        .iter()
        .map(|id| {
            let adapter = registry.adapter(*id);
            (
                id.as_str(),
                ProviderCheck {
                    configured: adapter.is_some(),
                    endpoint: adapter.map(|a| a.endpoint().to_string()),
                },
            )
        })
        .collect()
}

/// Healthy when every provider is usable, degraded when only the default
/// is, unhealthy when the default is not
pub fn overall_status(registry: &ProviderRegistry) -> HealthStatus {
    if !registry.is_configured(registry.default_provider()) {
        HealthStatus::Unhealthy
    } else if ProviderId::ALL.iter().all(|id| registry.is_configured(*id)) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

/// Full health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let registry = state.gateway.registry();
    let overall_status = overall_status(registry);

    let response = HealthResponse {
        status: overall_status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        default_provider: registry.default_provider(),
        providers: provider_checks(registry),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Readiness probe endpoint
///
/// Returns 200 OK once the default provider is fully configured.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    let registry = state.gateway.registry();

    if !registry.is_configured(registry.default_provider()) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
