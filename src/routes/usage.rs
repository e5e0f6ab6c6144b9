//! Client usage reporting endpoint

use std::sync::Arc;

use axum::{extract::State, Json};
use bytes::Bytes;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::usage::UsageEntry;
use crate::AppState;

/// `POST /usage`
///
/// Always answers `{ ok: true }`; a body that is not a JSON object is
/// logged and dropped.
pub async fn report_usage(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    match serde_json::from_slice::<Map<String, Value>>(&body) {
        Ok(fields) => state.usage_logger.track(UsageEntry::from_fields(fields)),
        Err(e) => warn!(error = %e, body_size = body.len(), "Dropped unparseable usage report"),
    }

    Json(json!({ "ok": true }))
}
