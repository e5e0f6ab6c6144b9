//! HTTP routes for Askgate
//!
//! This module defines all HTTP endpoints exposed by the gateway.

pub mod chat;
pub mod health;
pub mod metrics;
pub mod search;
pub mod usage;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::AppState;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Browser-facing endpoints; each answers its own pre-flight
    let public_api = Router::new()
        .route("/chat", post(chat::chat).options(preflight))
        .route("/search", post(search::search).options(preflight))
        .route("/usage", post(usage::report_usage).options(preflight));

    // Operational endpoints
    let ops_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_api)
        .merge(ops_routes)
        // Global middleware (applied to all routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .with_state(state)
}

/// Pre-flight acknowledgment; cross-origin headers are added by the router
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
