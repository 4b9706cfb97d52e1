//! Generation intake and status integration tests.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use docgen_core::types::ThesisId;
use helpers::TestApp;

#[tokio::test]
async fn test_generation_runs_to_completion() {
    let app = TestApp::new();
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
    assert_eq!(accepted.body["status"], "pending");
    let job_id = accepted.body["jobId"].as_str().unwrap().to_string();

    let pending = app
        .get(&format!("/api/generations/status?id={thesis_id}"))
        .await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["status"], "pending");
    assert_eq!(pending.body["jobId"], job_id.as_str());

    assert!(app.run_worker_once().await);

    let done = app
        .get(&format!("/api/generations/status?id={thesis_id}"))
        .await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["status"], "completed");
    assert_eq!(done.body["artifact"]["version_number"], 1);
    assert_eq!(done.body["artifact"]["citation_count"], 1);
    assert!(done.body["completedAt"].is_string());

    let versions = app
        .get(&format!("/api/theses/{thesis_id}/versions"))
        .await;
    assert_eq!(versions.status, StatusCode::OK);
    assert_eq!(versions.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_request_does_not_enqueue_twice() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    let body = json!({
        "domainId": thesis_id.to_string(),
        "generationPayload": helpers::generation_payload()
    });

    let first = app.post("/api/generations", body.clone()).await;
    assert_eq!(first.status, StatusCode::ACCEPTED);

    let second = app.post("/api/generations", body).await;
    assert_eq!(second.status, StatusCode::OK);
    assert!(second.body["jobId"].is_null());
    assert_eq!(second.body["status"], "pending");
    assert_eq!(second.body["record"]["jobId"], first.body["jobId"]);

    assert!(app.run_worker_once().await);
    assert!(!app.run_worker_once().await);
}

#[tokio::test]
async fn test_completed_document_is_not_regenerated() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    let body = json!({
        "domainId": thesis_id.to_string(),
        "generationPayload": helpers::generation_payload()
    });

    app.post("/api/generations", body.clone()).await;
    assert!(app.run_worker_once().await);

    let again = app.post("/api/generations", body).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["status"], "completed");
    assert_eq!(again.body["currentVersion"], 1);
    assert!(again.body["jobId"].is_null());
}

#[tokio::test]
async fn test_missing_domain_id_is_rejected() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/generations",
            json!({ "generationPayload": helpers::generation_payload() }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
    assert!(!app.run_worker_once().await);
}

#[tokio::test]
async fn test_invalid_payload_is_rejected() {
    let app = TestApp::new();
    let mut payload = helpers::generation_payload();
    payload["outline"] = json!([]);

    let response = app
        .post(
            "/api/generations",
            json!({ "domainId": ThesisId::new().to_string(), "generationPayload": payload }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!app.run_worker_once().await);
}

#[tokio::test]
async fn test_unknown_thesis_status_is_not_found() {
    let app = TestApp::new();

    let response = app
        .get(&format!("/api/generations/status?id={}", ThesisId::new()))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let health = app.get("/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}
