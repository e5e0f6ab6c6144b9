//! `/chat` integration tests
//!
//! Every request goes through the real router and gateway; upstream
//! providers are wiremock servers.

use std::collections::HashSet;
use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use askgate::ProviderId;

use crate::common::{constants, spawn_app, TestConfig};
use crate::mocks::{MockPrimary, MockSecondary};

#[tokio::test]
async fn test_primary_answers_question() {
    let primary = MockPrimary::start().await;
    primary
        .mock_answer("Corrective and Preventive Action (CAPA) is a quality process.")
        .await;
    let app = spawn_app(TestConfig::new().primary(&primary.endpoint()).build());

    let response = app.server.post("/chat").json(&json!({"q": "What is a CAPA?"})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["provider"], "PRIMARY");
    assert!(body["answer"]
        .as_str()
        .unwrap()
        .starts_with("Corrective and Preventive Action"));
    assert_eq!(body["model"], "gpt-4o-mini-2024-07-18");
    assert_eq!(body["requestId"], "req_primary_1");

    let cid = body["cid"].as_str().unwrap();
    assert!(!cid.is_empty());
    assert_eq!(response.headers()["x-correlation-id"], cid);
}

#[tokio::test]
async fn test_primary_request_shape() {
    let primary = MockPrimary::start().await;
    primary.mock_answer("ok").await;
    let app = spawn_app(TestConfig::new().primary(&primary.endpoint()).build());

    app.server
        .post("/chat")
        .json(&json!({"q": "  What is a CAPA?  ", "context": "SOP-12 excerpt"}))
        .await
        .assert_status_ok();

    let bodies = primary.received_bodies().await;
    assert_eq!(bodies.len(), 1);
    let sent = &bodies[0];
    assert_eq!(sent["model"], constants::PRIMARY_MODEL);
    assert_eq!(sent["temperature"], 0.2);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(
        sent["messages"][1]["content"],
        "What is a CAPA?\n\nContext:\nSOP-12 excerpt"
    );
}

#[tokio::test]
async fn test_override_routes_to_secondary() {
    let primary = MockPrimary::start().await;
    let secondary = MockSecondary::start().await;
    secondary.mock_answer("from secondary").await;
    let app = spawn_app(
        TestConfig::new()
            .primary(&primary.endpoint())
            .secondary(&secondary.endpoint())
            .build(),
    );

    let response = app
        .server
        .post("/chat")
        .json(&json!({"q": "hi", "context": "ctx", "providerOverride": "secondary"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["provider"], "SECONDARY");
    assert_eq!(body["answer"], "from secondary");
    assert_eq!(
        secondary.received_bodies().await,
        vec![json!({"prompt": "hi", "context": "ctx"})]
    );
    assert!(primary.received_bodies().await.is_empty());
}

#[tokio::test]
async fn test_missing_secondary_config() {
    let primary = MockPrimary::start().await;
    let app = spawn_app(TestConfig::new().primary(&primary.endpoint()).build());

    let response = app
        .server
        .post("/chat")
        .json(&json!({"q": "hi", "providerOverride": "SECONDARY"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "MISSING_SECONDARY_CONFIG");
    assert_eq!(body["error"]["status"], 500);
    assert_eq!(body["error"]["provider"], "SECONDARY");
    assert_eq!(
        body["error"]["message"],
        "SECONDARY_API_URL and SECONDARY_API_KEY not set."
    );
    assert!(body["error"]["hint"].is_string());
    assert!(primary.received_bodies().await.is_empty());
}

#[tokio::test]
async fn test_unknown_override_uses_default() {
    let secondary = MockSecondary::start().await;
    secondary.mock_answer("default answered").await;
    let app = spawn_app(
        TestConfig::new()
            .secondary(&secondary.endpoint())
            .default_provider(ProviderId::Secondary)
            .build(),
    );

    let response = app
        .server
        .post("/chat")
        .json(&json!({"q": "hi", "providerOverride": "TERTIARY"}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["provider"], "SECONDARY");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = spawn_app(TestConfig::new().build());

    for raw in ["{not json", "[1,2,3]", "42"] {
        let response = app.server.post("/chat").text(raw).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "BAD_REQUEST", "body: {raw}");
        assert_eq!(body["error"]["message"], "Invalid JSON body.");
        assert_eq!(body["error"]["hint"], r#"Send a JSON body like {"q":"Hello"}"#);
    }
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let app = spawn_app(TestConfig::new().build());

    for payload in [json!({}), json!({"q": "   "}), json!({"question": "hi"})] {
        let response = app.server.post("/chat").json(&payload).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "MISSING_QUERY");
        assert_eq!(body["error"]["status"], 400);
        assert_eq!(body["error"]["provider"], "PRIMARY");
        assert_eq!(body["error"]["endpoint"], "");
        assert_eq!(body["error"]["requestId"], "");
    }
}

#[tokio::test]
async fn test_correlation_ids_are_unique_per_request() {
    let primary = MockPrimary::start().await;
    primary.mock_answer("same answer").await;
    let app = spawn_app(TestConfig::new().primary(&primary.endpoint()).build());

    let mut cids = HashSet::new();
    let mut answers = HashSet::new();
    for _ in 0..3 {
        let body: Value = app
            .server
            .post("/chat")
            .json(&json!({"q": "same", "context": "same"}))
            .await
            .json();
        cids.insert(body["cid"].as_str().unwrap().to_string());
        answers.insert(body["answer"].as_str().unwrap().to_string());
    }

    assert_eq!(cids.len(), 3);
    assert_eq!(answers.len(), 1);
}

#[tokio::test]
async fn test_long_context_is_truncated_before_forwarding() {
    let secondary = MockSecondary::start().await;
    secondary.mock_answer("ok").await;
    let app = spawn_app(
        TestConfig::new()
            .secondary(&secondary.endpoint())
            .default_provider(ProviderId::Secondary)
            .build(),
    );

    app.server
        .post("/chat")
        .json(&json!({"q": "hi", "context": "c".repeat(7000)}))
        .await
        .assert_status_ok();

    let bodies = secondary.received_bodies().await;
    let forwarded = bodies[0]["context"].as_str().unwrap();
    assert_eq!(forwarded.chars().count(), 6001);
    assert!(forwarded.starts_with(&"c".repeat(6000)));
    assert!(forwarded.ends_with('…'));
}

#[tokio::test]
async fn test_upstream_timeout_is_504() {
    let primary = MockPrimary::start().await;
    primary.mock_slow(Duration::from_millis(1_500)).await;
    let app = spawn_app(
        TestConfig::new()
            .primary(&primary.endpoint())
            .timeout_ms(200)
            .build(),
    );

    let response = app.server.post("/chat").json(&json!({"q": "hi"})).await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "UPSTREAM_TIMEOUT");
    assert_eq!(body["error"]["details"]["timeoutMs"], 200);
    assert_eq!(body["error"]["endpoint"], primary.endpoint());
    assert!(body.get("answer").is_none());
}

#[tokio::test]
async fn test_unreachable_upstream_is_502() {
    let app = spawn_app(TestConfig::new().primary(constants::UNREACHABLE_URL).build());

    let response = app.server.post("/chat").json(&json!({"q": "hi"})).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PRIMARY_NETWORK_ERROR");
    assert_eq!(body["error"]["model"], constants::PRIMARY_MODEL);
    assert!(body["error"]["stack"].is_string());
}

#[tokio::test]
async fn test_stack_is_hidden_in_production() {
    let app = spawn_app(
        TestConfig::new()
            .primary(constants::UNREACHABLE_URL)
            .production()
            .build(),
    );

    let body: Value = app.server.post("/chat").json(&json!({"q": "hi"})).await.json();

    assert_eq!(body["error"]["code"], "PRIMARY_NETWORK_ERROR");
    assert!(body["error"].get("stack").is_none());
}

#[tokio::test]
async fn test_rate_limited_upstream() {
    let primary = MockPrimary::start().await;
    primary
        .mock_error(
            429,
            json!({"error": {"message": "Rate limit reached for requests", "type": "requests", "code": "rate_limit_exceeded"}}),
            &[
                ("retry-after", "20"),
                ("x-ratelimit-limit-requests", "500"),
                ("x-ratelimit-remaining-requests", "0"),
                ("x-request-id", "req_rl"),
            ],
        )
        .await;
    let app = spawn_app(TestConfig::new().primary(&primary.endpoint()).build());

    let response = app.server.post("/chat").json(&json!({"q": "hi"})).await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "20");
    let error = &response.json::<Value>()["error"];
    assert_eq!(error["code"], "rate_limit_exceeded");
    assert_eq!(error["message"], "Rate limit reached for requests");
    assert_eq!(error["requestId"], "req_rl");
    assert_eq!(
        error["rateLimit"],
        json!({"retryAfter": 20, "limit": "500", "remaining": "0"})
    );
    assert!(error["hint"].as_str().unwrap().contains("retryAfter"));
}

#[tokio::test]
async fn test_unauthorized_upstream_gets_key_hint() {
    let secondary = MockSecondary::start().await;
    secondary
        .mock_error(401, json!({"error": "invalid api key"}), &[])
        .await;
    let app = spawn_app(
        TestConfig::new()
            .secondary(&secondary.endpoint())
            .default_provider(ProviderId::Secondary)
            .build(),
    );

    let response = app.server.post("/chat").json(&json!({"q": "hi"})).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let error = &response.json::<Value>()["error"];
    assert_eq!(error["code"], "SECONDARY_ERROR");
    assert_eq!(error["message"], "invalid api key");
    assert!(error["hint"].as_str().unwrap().contains("API key"));
    assert_eq!(error["details"], json!({"error": "invalid api key"}));
    assert!(error.get("rateLimit").is_none());
    assert!(response.headers().get("retry-after").is_none());
}

#[tokio::test]
async fn test_plain_text_upstream_error_is_truncated() {
    let secondary = MockSecondary::start().await;
    secondary.mock_text_error(503, &"e".repeat(3_000)).await;
    let app = spawn_app(
        TestConfig::new()
            .secondary(&secondary.endpoint())
            .default_provider(ProviderId::Secondary)
            .build(),
    );

    let response = app.server.post("/chat").json(&json!({"q": "hi"})).await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let error = &response.json::<Value>()["error"];
    assert_eq!(error["message"].as_str().unwrap().len(), 2_000);
    assert_eq!(error["details"]["raw"].as_str().unwrap().len(), 2_000);
    assert!(error["hint"].as_str().unwrap().contains("backoff"));
    assert_eq!(secondary.request_count().await, 1);
}

#[tokio::test]
async fn test_oversized_body_still_gets_envelope() {
    let primary = MockPrimary::start().await;
    let app = spawn_app(TestConfig::new().primary(&primary.endpoint()).build());
    let context = "x".repeat(3 * 1024 * 1024);

    let response = app
        .server
        .post("/chat")
        .json(&json!({"q": "hi", "context": context}))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["error"]["status"], 413);
    assert_eq!(body["error"]["provider"], "PRIMARY");
    let cid = body["error"]["cid"].as_str().unwrap();
    assert!(!cid.is_empty());
    assert_eq!(response.headers()["x-correlation-id"], cid);
    assert!(primary.received_bodies().await.is_empty());
}
