//! HTTP-level tests for the grounding API.

mod harness;

use axum::http::StatusCode;
use grounding::testing::{signals_with_score, MockAI, PromptKind};
use grounding::{CallFilter, CallStore};
use harness::TestApp;
use serde_json::json;

fn signals_body(score: u8) -> serde_json::Value {
    serde_json::to_value(signals_with_score(score)).unwrap()
}

#[tokio::test]
async fn test_health_reports_in_memory_storage() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "rag-pipeline");
    assert_eq!(body["knowledge_docs"], 0);
    assert_eq!(body["database"]["status"], "in_memory");
}

#[tokio::test]
async fn test_seed_loads_bundled_files() {
    let app = TestApp::new();
    let body = app.seed().await;

    assert_eq!(body["seeded"], true);
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["by_category"]["fraud_pattern"], 6);
    assert_eq!(body["by_category"]["compliance"], 5);
    assert_eq!(body["by_category"]["risk_heuristic"], 5);
    assert_eq!(body["total_in_db"], 16);

    // Seeding twice upserts
    let again = app.seed().await;
    assert_eq!(again["total_in_db"], 16);
}

#[tokio::test]
async fn test_analyze_before_seed_is_unavailable() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/v1/analyze-call", signals_body(60)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("/api/v1/knowledge/seed"));
    let stored = app
        .deps
        .pipeline
        .store()
        .list_calls(&CallFilter::default())
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_analyze_rejects_out_of_range_signals() {
    let app = TestApp::new();
    app.seed().await;

    let mut body = signals_body(60);
    body["risk_assessment"]["confidence"] = json!(1.5);
    let (status, _) = app.post("/api/v1/analyze-call", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_then_read_back() {
    let app = TestApp::new();
    app.seed().await;

    let (status, body) = app.post("/api/v1/analyze-call", signals_body(60)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["rag_output"]["grounded_assessment"], "medium_risk");
    assert_eq!(body["input_risk_assessment"]["risk_score"], 60);

    let call_id = body["call_id"].as_str().unwrap().to_string();
    assert!(call_id.starts_with("call_"));

    let (status, call) = app.get(&format!("/api/v1/call/{}", call_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(call["status"], "escalated");
    assert!(call["rag_output"].is_object());

    let (status, document) = app.get(&format!("/api/v1/call/{}/document", call_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(document["call_summary"].as_str().unwrap().contains("15000"));
}

#[tokio::test]
async fn test_status_update_and_listing() {
    let app = TestApp::new();
    app.seed().await;

    let (_, low) = app.post("/api/v1/analyze-call", signals_body(20)).await;
    let (_, high) = app.post("/api/v1/analyze-call", signals_body(80)).await;
    let low_id = low["call_id"].as_str().unwrap();
    let high_id = high["call_id"].as_str().unwrap();

    let (status, body) = app
        .patch(
            &format!("/api/v1/call/{}/status", high_id),
            json!({"status": "in_review"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_review");

    let (status, list) = app.get("/api/v1/calls?status=in_review").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert_eq!(list["calls"][0]["call_id"], high_id);

    let (_, all) = app.get("/api/v1/calls?limit=1").await;
    assert_eq!(all["count"], 1);

    let (_, resolved) = app.get("/api/v1/calls?status=resolved").await;
    assert_eq!(resolved["calls"][0]["call_id"], low_id);
}

#[tokio::test]
async fn test_unknown_status_value_rejected() {
    let app = TestApp::new();
    app.seed().await;
    let (_, body) = app.post("/api/v1/analyze-call", signals_body(40)).await;
    let call_id = body["call_id"].as_str().unwrap();

    let (status, _) = app
        .patch(&format!("/api/v1/call/{}/status", call_id), json!({"status": "closed"}))
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_missing_and_malformed_call_ids() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/v1/call/call_2026_01_01_abcdef").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());

    let (status, _) = app.get("/api/v1/call/not-a-call-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            "/api/v1/call/call_2026_01_01_abcdef/status",
            json!({"status": "resolved"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/v1/call/call_2026_01_01_abcdef/document/regenerate", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_regenerate_document() {
    let app = TestApp::new();
    app.seed().await;
    let (_, body) = app.post("/api/v1/analyze-call", signals_body(55)).await;
    let call_id = body["call_id"].as_str().unwrap();

    let (status, document) = app
        .post(&format!("/api/v1/call/{}/document/regenerate", call_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(document["call_summary"].is_string());
}

#[tokio::test]
async fn test_chat_rejects_short_question() {
    let app = TestApp::new();
    app.seed().await;

    let (status, body) = app.post("/api/v1/chat", json!({"question": "hi"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_chat_answers_with_sources() {
    let app = TestApp::new();
    app.seed().await;

    let (status, body) = app
        .post(
            "/api/v1/chat",
            json!({"question": "What are the permitted calling hours?"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["answer"].is_string());
    assert!(!body["sources"].as_array().unwrap().is_empty());
    assert_eq!(body["metadata"]["calls_searched"], 0);
}

#[tokio::test]
async fn test_chat_survives_model_outage() {
    let app = TestApp::with_ai(MockAI::new().failing(PromptKind::Chat, 5));
    app.seed().await;

    let (status, body) = app
        .post(
            "/api/v1/chat",
            json!({"question": "Which calls showed stalling behaviour?"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["model"], "fallback");
}
