//! Primary provider: chat-completions wire shape
//!
//! Requests carry a system prompt plus one user message; answers live at
//! `choices[0].message.content`.

use serde_json::{json, Value};

use crate::gateway::request::Query;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature sent with every completion request
pub const TEMPERATURE: f64 = 0.2;

/// Build a chat-completions request body
pub fn build_request(model: Option<&str>, system_prompt: &str, query: &Query) -> Value {
    let mut user_content = query.text.clone();
    if !query.context.is_empty() {
        user_content.push_str("\n\nContext:\n");
        user_content.push_str(&query.context);
    }

    json!({
        "model": model.unwrap_or(DEFAULT_MODEL),
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_content },
        ],
        "temperature": TEMPERATURE,
    })
}

/// Extract `choices[0].message.content`
///
/// Content given as an array of parts is joined from its text parts.
pub fn extract_answer(body: &Value) -> Option<String> {
    let content = body.pointer("/choices/0/message/content")?;

    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}
