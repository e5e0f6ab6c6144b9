//! Secondary provider: prompt/answer wire shape
//!
//! Requests are `{ prompt, context }`; answers come back as `output_text`
//! or `answer`.

use serde_json::{json, Value};

use crate::gateway::request::Query;

/// Build a prompt/answer request body
pub fn build_request(model: Option<&str>, query: &Query) -> Value {
    let mut body = json!({
        "prompt": query.text,
        "context": query.context,
    });
    if let Some(model) = model {
        body["model"] = json!(model);
    }
    body
}

/// Extract the first non-empty `output_text` or `answer`
///
/// A bare JSON string body is taken as the answer.
pub fn extract_answer(body: &Value) -> Option<String> {
    if let Value::String(text) = body {
        return Some(text.clone());
    }

    ["output_text", "answer"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
