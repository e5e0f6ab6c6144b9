//! Knowledge search endpoint tests

use std::io::Write;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{spawn_app, TestConfig};

fn knowledge_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let documents = json!([
        {"id": "sop-12", "title": "CAPA procedure", "text": "Corrective and preventive action workflow", "url": "https://docs.test/sop-12"},
        {"id": "sop-30", "title": "Deviation handling", "text": "Deviations may open a CAPA"},
        {"id": "sop-40", "title": "Supplier audits", "text": "Annual supplier audit plan"}
    ]);
    write!(file, "{documents}").unwrap();
    file
}

#[tokio::test]
async fn test_search_ranks_documents() {
    let file = knowledge_file();
    let app = spawn_app(TestConfig::new().knowledge(file.path().to_path_buf()).build());

    let response = app
        .server
        .post("/search")
        .json(&json!({"q": "CAPA corrective"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "sop-12");
    assert_eq!(results[0]["score"], 2);
    assert_eq!(results[0]["url"], "https://docs.test/sop-12");
    assert_eq!(results[1]["id"], "sop-30");
    assert!(results[1].get("url").is_none());
}

#[tokio::test]
async fn test_search_without_knowledge_is_empty() {
    let app = spawn_app(TestConfig::new().build());

    let body: Value = app
        .server
        .post("/search")
        .json(&json!({"q": "anything"}))
        .await
        .json();

    assert_eq!(body, json!({"ok": true, "results": []}));
}

#[tokio::test]
async fn test_search_empty_query() {
    let file = knowledge_file();
    let app = spawn_app(TestConfig::new().knowledge(file.path().to_path_buf()).build());

    for payload in [json!({}), json!({"q": ""}), json!({"q": 7})] {
        let body: Value = app.server.post("/search").json(&payload).await.json();
        assert_eq!(body, json!({"ok": true, "results": []}));
    }
}

#[tokio::test]
async fn test_search_bad_json() {
    let app = spawn_app(TestConfig::new().build());

    let response = app.server.post("/search").text("{oops").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["message"], "Bad JSON");
    assert!(body["error"]["details"].is_string());
}

#[tokio::test]
async fn test_search_rejects_non_object_body() {
    let file = knowledge_file();
    let app = spawn_app(TestConfig::new().knowledge(file.path().to_path_buf()).build());

    for payload in [json!(["capa"]), json!("capa")] {
        let response = app.server.post("/search").json(&payload).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["message"], "Bad JSON");
    }
}
