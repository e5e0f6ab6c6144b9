//! Response normalizer
//!
//! Maps a raw provider response into the response envelope. A 2xx status
//! is a success even when no answer can be found in the body; the answer is
//! then empty.

use tracing::debug;

use crate::envelope::{Failure, ResponseEnvelope, SuccessBody};
use crate::provider::ProviderAdapter;
use crate::proxy::RawResponse;

/// Cap on raw upstream text carried into messages and details
pub const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Build the envelope for a provider response
pub fn normalize(adapter: &ProviderAdapter, raw: &RawResponse, cid: &str) -> ResponseEnvelope {
    let parsed = raw.parsed();

    if raw.is_success() {
        if let Some(rate_limit) = adapter.rate_limit(&raw.headers) {
            debug!(cid = %cid, provider = %adapter.id(), ?rate_limit, "Upstream rate-limit headers");
        }

        return ResponseEnvelope::Success(SuccessBody {
            answer: adapter
                .extract_answer(parsed.as_ref(), &raw.text)
                .unwrap_or_default(),
            provider: adapter.id(),
            model: adapter.response_model(parsed.as_ref()),
            cid: cid.to_string(),
            request_id: raw.request_id(),
        });
    }

    let info = adapter.extract_error(raw.status, parsed.as_ref(), &raw.text, &raw.headers);

    let failure = Failure::new(raw.status, info.code, info.message, adapter.id(), cid)
        .with_endpoint(adapter.endpoint())
        .with_request_id(raw.request_id())
        .with_model(adapter.model().map(str::to_string))
        .with_hint(info.hint)
        .with_rate_limit(info.rate_limit);

    ResponseEnvelope::Failure(match info.details {
        Some(details) => failure.with_details(details),
        None => failure,
    })
}
