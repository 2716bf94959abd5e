//! Registration, login and token refresh flows.

mod common;

use common::TestApp;
use serde_json::{Value, json};
use uuid::Uuid;

fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4())
}

#[tokio::test]
async fn register_creates_account() {
    let app = TestApp::spawn().await;
    let email = unique_email();

    let response = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": email, "name": "New User", "password": "password123" }))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["email"], email.as_str());
    assert_eq!(body["name"], "New User");
    assert!(body.get("password_hash").is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;
    let email = unique_email();
    let payload = json!({ "email": email, "name": "New User", "password": "password123" });

    let first = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(first.status().as_u16(), 201);

    let second = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(second.status().as_u16(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn register_rejects_missing_and_short_fields() {
    let app = TestApp::spawn().await;

    // Short password
    let response = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": unique_email(), "name": "User", "password": "short" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status().as_u16(), 422);

    // Missing name entirely
    let response = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": unique_email(), "password": "password123" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn login_returns_token_pair() {
    let app = TestApp::spawn().await;
    let email = unique_email();

    app.client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": email, "name": "User", "password": "password123" }))
        .send()
        .await
        .expect("Failed to register");

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to login");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Invalid body");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(body["token_type"], "Bearer");

    app.cleanup().await;
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    let email = unique_email();

    app.client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": email, "name": "User", "password": "password123" }))
        .send()
        .await
        .expect("Failed to register");

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to login");
    assert_eq!(response.status().as_u16(), 401);

    app.cleanup().await;
}

#[tokio::test]
async fn refresh_exchanges_token_for_new_access_token() {
    let app = TestApp::spawn().await;
    let email = unique_email();

    app.client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "email": email, "name": "User", "password": "password123" }))
        .send()
        .await
        .expect("Failed to register");

    let login: Value = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to login")
        .json()
        .await
        .expect("Invalid body");

    let response = app
        .client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({ "refresh_token": login["refresh_token"] }))
        .send()
        .await
        .expect("Failed to refresh");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Invalid body");
    let access_token = body["access_token"].as_str().expect("Missing access token");

    // The new token works against a protected route.
    let response = app
        .client
        .get(format!("{}/api/clients", app.address))
        .bearer_auth(access_token)
        .send()
        .await
        .expect("Failed to list clients");
    assert_eq!(response.status().as_u16(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn refresh_rejects_garbage_token() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/api/auth/refresh", app.address))
        .json(&json!({ "refresh_token": "not-a-jwt" }))
        .send()
        .await
        .expect("Failed to refresh");
    assert_eq!(response.status().as_u16(), 401);

    app.cleanup().await;
}
