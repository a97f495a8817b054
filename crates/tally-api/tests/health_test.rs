//! Probe and API document tests.

mod helpers;

use axum::http::StatusCode;
use helpers::setup_test_app;
use serde_json::Value;

#[tokio::test]
async fn test_health_and_ready() {
    let app = setup_test_app();

    app.client().get("/health").await.assert_status_ok();

    let response = app.client().get("/ready").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["database"], "ready");
}

#[tokio::test]
async fn test_ready_reports_unavailable_database() {
    let app = setup_test_app();
    app.store.set_unavailable(true);

    let response = app.client().get("/ready").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["status"], "not_ready");
}

#[tokio::test]
async fn test_database_outage_fails_authenticated_requests() {
    let app = setup_test_app();
    app.store.set_unavailable(true);

    let response = app
        .client()
        .post("/api/issue-signed-receipt")
        .add_header("Cookie", helpers::MEMBER_COOKIE)
        .json(&serde_json::json!({ "group_id": "42" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["code"], "DATABASE_ERROR");
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let app = setup_test_app();

    let response = app.client().get("/api/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert!(doc["paths"]["/api/confirm-upload-and-start-ocr"].is_object());
    assert!(doc["paths"]["/api/issue-signed-receipt"].is_object());
}
