//! Question-answer endpoint
//!
//! Thin transport adapter: the raw body goes to the gateway, the envelope
//! comes back as the response.

use std::sync::Arc;

use axum::extract::{rejection::BytesRejection, State};
use bytes::Bytes;

use crate::envelope::ResponseEnvelope;
use crate::error::GatewayError;
use crate::AppState;

/// `POST /chat`
///
/// A body the transport refuses (over the size limit, broken stream) still
/// gets a failure envelope with a correlation id.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ResponseEnvelope {
    match body {
        Ok(body) => state.gateway.handle(&body).await,
        Err(rejection) => state.gateway.reject(GatewayError::UnreadableBody {
            status: rejection.status(),
            reason: rejection.body_text(),
        }),
    }
}
