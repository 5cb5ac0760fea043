//! Integration tests for the health probes and the static entry page.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;

use sqlagent_integration_tests::spawn_app;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_readiness_follows_credential_store() {
    let app = spawn_app().await;

    let ready = app.client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    app.admins.set_unreachable(true);
    let down = app.client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Index
// =============================================================================

#[tokio::test]
async fn test_index_serves_file() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/index")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("<title>SQL Agent</title>"));
}

#[tokio::test]
async fn test_index_missing_file_is_not_found() {
    let app = spawn_app().await;
    std::fs::remove_file(&app.index_file).unwrap();

    let response = app.client.get(app.url("/index")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
