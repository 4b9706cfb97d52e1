//! Version, derived artifact and passage search integration tests.

mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};

use docgen_core::types::ThesisId;
use helpers::TestApp;

async fn seed_versions(app: &TestApp, thesis_id: ThesisId) {
    let theses = &app.stores.theses;
    theses
        .save_content(thesis_id, "Heat islands", "First draft.", &json!([]), "v1")
        .await
        .unwrap();
    theses
        .save_content(thesis_id, "Heat islands", "Second draft.", &json!([]), "v2")
        .await
        .unwrap();
}

async fn waiting_jobs(app: &TestApp) -> u64 {
    app.queue
        .stats()
        .await
        .unwrap()
        .queues
        .iter()
        .map(|q| q.counts.waiting)
        .sum()
}

fn quiz(count: usize) -> Value {
    let questions: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "question": format!("Question {i}?"),
                "options": ["A", "B", "C", "D"],
                "correctIndex": i % 4
            })
        })
        .collect();
    json!(questions)
}

#[tokio::test]
async fn test_existing_quiz_is_returned() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;
    let existing = quiz(25);
    app.stores.theses.save_quiz(thesis_id, &existing).await.unwrap();

    let response = app
        .post(
            "/api/theses/quiz",
            json!({ "domainId": thesis_id.to_string(), "questionCount": 25 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"], existing);
    assert!(response.body["jobId"].is_null());
    assert_eq!(waiting_jobs(&app).await, 0);
}

#[tokio::test]
async fn test_missing_quiz_is_enqueued() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;

    let response = app
        .post(
            "/api/theses/quiz",
            json!({ "domainId": thesis_id.to_string() }),
        )
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert!(response.body["jobId"].is_string());
    assert_eq!(waiting_jobs(&app).await, 1);
}

#[tokio::test]
async fn test_quiz_without_content_is_rejected() {
    let app = TestApp::new();

    let unknown = app
        .post(
            "/api/theses/quiz",
            json!({ "domainId": ThesisId::new().to_string() }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;
    let zero = app
        .post(
            "/api/theses/search-queries",
            json!({ "domainId": thesis_id.to_string(), "queryCount": 0 }),
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_existing_search_queries_are_returned() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;
    let queries = json!([{ "query": "green roof surface temperature", "language": "en" }]);
    app.stores
        .theses
        .save_search_queries(thesis_id, &queries)
        .await
        .unwrap();

    let response = app
        .post(
            "/api/theses/search-queries",
            json!({ "domainId": thesis_id.to_string() }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"], queries);
}

#[tokio::test]
async fn test_versions_are_listed_newest_first() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;

    let response = app
        .get(&format!("/api/theses/{thesis_id}/versions"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let numbers: Vec<i64> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["versionNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);
    assert_eq!(response.body[0]["wordCount"], 2);
}

#[tokio::test]
async fn test_rollback_is_idempotent() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;
    let body = json!({ "domainId": thesis_id.to_string(), "versionNumber": 1 });

    let first = app.post("/api/theses/rollback", body.clone()).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["content"], "First draft.");
    assert_eq!(first.body["currentVersion"], 1);

    let second = app.post("/api/theses/rollback", body).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["content"], first.body["content"]);
    assert_eq!(second.body["currentVersion"], 1);
}

#[tokio::test]
async fn test_rollback_to_missing_version_is_not_found() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();
    seed_versions(&app, thesis_id).await;

    let missing = app
        .post(
            "/api/theses/rollback",
            json!({ "domainId": thesis_id.to_string(), "versionNumber": 9 }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let unknown = app
        .post(
            "/api/theses/rollback",
            json!({ "domainId": ThesisId::new().to_string(), "versionNumber": 1 }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let invalid = app
        .post(
            "/api/theses/rollback",
            json!({ "domainId": thesis_id.to_string(), "versionNumber": 0 }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_passage_search_validates_input() {
    let app = TestApp::new();
    let thesis_id = ThesisId::new();

    let empty = app
        .post(
            "/api/theses/passages",
            json!({ "domainId": thesis_id.to_string(), "query": " " }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let found = app
        .post(
            "/api/theses/passages",
            json!({ "domainId": thesis_id.to_string(), "query": "green roofs", "limit": 3 }),
        )
        .await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body, json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let app = TestApp::new();

    let response = app
        .request(
            axum::http::Method::POST,
            "/api/theses/rollback",
            Some(json!("not an object")),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
}
