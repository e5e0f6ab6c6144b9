//! Mock secondary provider (prompt/answer API)

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::constants;

pub const SECONDARY_PATH: &str = "/answer";

/// Mock secondary provider server wrapper
pub struct MockSecondary {
    server: MockServer,
}

impl MockSecondary {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Endpoint to configure as `SECONDARY_API_URL`
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server.uri(), SECONDARY_PATH)
    }

    /// `{ output_text }` answer, checked for the bearer key
    pub async fn mock_answer(&self, answer: &str) {
        Mock::given(method("POST"))
            .and(path(SECONDARY_PATH))
            .and(header(
                "authorization",
                format!("Bearer {}", constants::SECONDARY_API_KEY).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output_text": answer })))
            .mount(&self.server)
            .await;
    }

    /// Error response with a JSON body and optional headers
    pub async fn mock_error(&self, status: u16, body: Value, headers: &[(&str, &str)]) {
        let mut template = ResponseTemplate::new(status).set_body_json(body);
        for (name, value) in headers {
            template = template.insert_header(*name, *value);
        }
        Mock::given(method("POST"))
            .and(path(SECONDARY_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Plain-text error page
    pub async fn mock_text_error(&self, status: u16, text: &str) {
        Mock::given(method("POST"))
            .and(path(SECONDARY_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(text))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
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
