//! Mock primary provider (chat-completions API)

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::constants;

pub const PRIMARY_PATH: &str = "/v1/chat/completions";

/// Mock primary provider server wrapper
pub struct MockPrimary {
    server: MockServer,
}

impl MockPrimary {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Endpoint to configure as `PRIMARY_API_URL`
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server.uri(), PRIMARY_PATH)
    }

    /// Chat completion whose first choice is `content`
    pub fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    /// Successful completion, checked for the bearer key
    pub async fn mock_answer(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .and(header(
                "authorization",
                format!("Bearer {}", constants::PRIMARY_API_KEY).as_str(),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-request-id", "req_primary_1")
                    .set_body_json(Self::completion(content)),
            )
            .mount(&self.server)
            .await;
    }

    /// Error response with the given body and headers
    pub async fn mock_error(&self, status: u16, body: Value, headers: &[(&str, &str)]) {
        let mut template = ResponseTemplate::new(status).set_body_json(body);
        for (name, value) in headers {
            template = template.insert_header(*name, *value);
        }
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Answer that arrives only after `delay`
    pub async fn mock_slow(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(delay)
                    .set_body_json(Self::completion("too late")),
            )
            .mount(&self.server)
            .await;
    }

    /// Bodies of every request the provider received
    pub async fn received_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| request.body_json::<Value>().expect("upstream body is JSON"))
            .collect()
    }
}
