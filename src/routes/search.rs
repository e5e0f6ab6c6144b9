//! Knowledge search endpoint

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use bytes::Bytes;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::AppState;

/// `POST /search`
///
/// Body `{ q }`; a non-string `q` searches for nothing. A body that is not
/// a JSON object is rejected like unparseable input.
pub async fn search(State(state): State<Arc<AppState>>, body: Bytes) -> (StatusCode, Json<Value>) {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice::<Map<String, Value>>(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected search body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "ok": false,
                        "error": { "message": "Bad JSON", "details": e.to_string() }
                    })),
                );
            }
        }
    };

    let query = request.get("q").and_then(Value::as_str).unwrap_or("").trim();
    let results = state.knowledge.search(query);
    debug!(query_chars = query.chars().count(), hits = results.len(), "Knowledge search");

    (StatusCode::OK, Json(json!({ "ok": true, "results": results })))
}
