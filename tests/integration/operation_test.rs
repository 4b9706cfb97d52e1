//! Provider operation integration tests.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use docgen_core::types::ThesisId;
use docgen_provider::OperationSnapshot;
use helpers::{ProviderReply, TestApp};

#[tokio::test(start_paused = true)]
async fn test_bounded_poll_times_out_with_snapshot() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/operations/poll",
            json!({ "operationHandle": "operations/op-slow", "maxWaitTime": 5000 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(response.body["error"], "TIMEOUT");
    assert_eq!(response.body["snapshot"]["name"], "operations/op-slow");
    assert_eq!(response.body["snapshot"]["done"], false);
    assert_eq!(response.body["elapsedMs"], 5000);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_poll_returns_finished_operation() {
    let app = TestApp::new();
    app.operations
        .push(OperationSnapshot::running("operations/op-1"));
    app.operations.push(OperationSnapshot::finished(
        "operations/op-1",
        json!({ "text": "done" }),
    ));

    let response = app
        .post(
            "/api/operations/poll",
            json!({ "operationHandle": "operations/op-1", "maxWaitTime": 60000 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["done"], true);
    assert_eq!(response.body["response"]["text"], "done");
}

#[tokio::test]
async fn test_operation_status_check() {
    let app = TestApp::new();
    app.operations.push(OperationSnapshot::failed(
        "operations/op-2",
        8,
        "quota exhausted",
    ));

    let response = app
        .post(
            "/api/operations/status",
            json!({ "operationHandle": "operations/op-2" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["done"], true);
    assert_eq!(response.body["error"]["message"], "quota exhausted");
}

#[tokio::test]
async fn test_empty_handle_is_rejected() {
    let app = TestApp::new();

    let status = app
        .post("/api/operations/status", json!({ "operationHandle": "  " }))
        .await;
    assert_eq!(status.status, StatusCode::BAD_REQUEST);

    let poll = app.post("/api/operations/poll", json!({})).await;
    assert_eq!(poll.status, StatusCode::BAD_REQUEST);
    assert_eq!(poll.body["error"], "VALIDATION");
}

#[tokio::test(start_paused = true)]
async fn test_generation_waits_on_provider_operation() {
    let app = TestApp::new();
    app.provider_reply(ProviderReply::Operation("operations/gen-1".to_string()));
    app.operations
        .push(OperationSnapshot::running("operations/gen-1"));
    app.operations.push(OperationSnapshot::finished(
        "operations/gen-1",
        json!({ "text": helpers::document_text() }),
    ));
    let thesis_id = ThesisId::new();

    let accepted = app
        .post(
            "/api/generations",
            json!({
                "domainId": thesis_id.to_string(),
                "generationPayload": helpers::generation_payload()
            }),
        )
        .await;
    assert_eq!(accepted.status, StatusCode::ACCEPTED);

    assert!(app.run_worker_once().await);

    let status = app
        .get(&format!("/api/generations/status?id={thesis_id}"))
        .await;
    assert_eq!(status.body["status"], "completed");
    assert_eq!(status.body["operationName"], "operations/gen-1");
}
