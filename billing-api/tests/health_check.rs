//! Health, readiness and metrics endpoint tests.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_reports_ok() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to request health");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "billing-api");

    app.cleanup().await;
}

#[tokio::test]
async fn readiness_check_reports_ok() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to request readiness");
    assert_eq!(response.status().as_u16(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to request metrics");

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.expect("Invalid body");
    assert!(body.contains("billing_"));

    app.cleanup().await;
}

#[tokio::test]
async fn api_routes_require_authentication() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/api/clients", app.address))
        .send()
        .await
        .expect("Failed to request clients");
    assert_eq!(response.status().as_u16(), 401);

    app.cleanup().await;
}
