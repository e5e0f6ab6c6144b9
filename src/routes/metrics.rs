//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

use crate::provider::ProviderId;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "askgate_requests_total",
        "Total number of /chat requests by provider and outcome"
    );
    metrics::describe_histogram!(
        "askgate_request_duration_seconds",
        "End-to-end /chat duration in seconds"
    );
    metrics::describe_counter!(
        "askgate_upstream_responses_total",
        "Upstream responses by provider and HTTP status"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished `/chat` request
///
/// `outcome` is `success` or an error category name.
pub fn record_request(provider: ProviderId, outcome: &'static str, duration_secs: f64) {
    metrics::counter!(
        "askgate_requests_total",
        "provider" => provider.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("askgate_request_duration_seconds", "provider" => provider.as_str())
        .record(duration_secs);
}

/// Record a status returned by an upstream provider
pub fn record_upstream_status(provider: ProviderId, status: u16) {
    metrics::counter!(
        "askgate_upstream_responses_total",
        "provider" => provider.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
}
