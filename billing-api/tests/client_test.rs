//! Client and company CRUD round trips, plus cascade behavior.

mod common;

use common::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn client_crud_round_trip() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;

    let created = app.create_client_fixture(&token).await;
    let client_id = created["client_id"].as_str().unwrap();
    assert_eq!(created["name"], "Acme Traders");

    let fetched: Value = app
        .client
        .get(format!("{}/api/clients/{}", app.address, client_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get client")
        .json()
        .await
        .expect("Invalid body");
    assert_eq!(fetched["client_id"], created["client_id"]);

    let updated: Value = app
        .client
        .put(format!("{}/api/clients/{}", app.address, client_id))
        .bearer_auth(&token)
        .json(&json!({ "phone": "+91-90000-00001" }))
        .send()
        .await
        .expect("Failed to update client")
        .json()
        .await
        .expect("Invalid body");
    assert_eq!(updated["phone"], "+91-90000-00001");
    assert_eq!(updated["name"], "Acme Traders");

    let response = app
        .client
        .delete(format!("{}/api/clients/{}", app.address, client_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete client");
    assert_eq!(response.status().as_u16(), 204);

    let response = app
        .client
        .get(format!("{}/api/clients/{}", app.address, client_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get client");
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_client_returns_not_found() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;

    let response = app
        .client
        .get(format!(
            "{}/api/clients/99999999-9999-9999-9999-999999999999",
            app.address
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get client");
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn second_company_for_same_account_conflicts() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;

    app.create_company_fixture(&token).await;

    let response = app
        .client
        .post(format!("{}/api/companies", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Second Company",
            "address": "Elsewhere",
            "gstin": "27AABCS1234A1Z5",
            "email": "second@example.com",
            "phone": "+91-22-4000-9999"
        }))
        .send()
        .await
        .expect("Failed to create company");
    assert_eq!(response.status().as_u16(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn deleting_client_cascades_to_invoices() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;
    let client = app.create_client_fixture(&token).await;
    let company = app.create_company_fixture(&token).await;
    let client_id = client["client_id"].as_str().unwrap();
    let company_id = company["company_id"].as_str().unwrap();

    let invoice = app
        .create_invoice_fixture(&token, client_id, company_id, "INV-CASCADE-1")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .client
        .delete(format!("{}/api/clients/{}", app.address, client_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete client");
    assert_eq!(response.status().as_u16(), 204);

    let response = app
        .client
        .get(format!("{}/api/invoices/{}", app.address, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get invoice");
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn deleting_account_nullifies_attribution_but_keeps_history() {
    let app = TestApp::spawn().await;

    // Account A owns the company; account B only creates the invoice, so B's
    // deletion exercises the SET NULL attribution rule without the
    // company-ownership cascade getting in the way.
    let token_a = app.register_and_login().await;
    let token_b = app.register_and_login().await;
    let client = app.create_client_fixture(&token_a).await;
    let company = app.create_company_fixture(&token_a).await;
    let client_id = client["client_id"].as_str().unwrap();
    let company_id = company["company_id"].as_str().unwrap();

    let invoice = app
        .create_invoice_fixture(&token_b, client_id, company_id, "INV-NULLIFY-1")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();
    let creator_id = invoice["created_by"].as_str().expect("created_by not set");

    // No account CRUD surface exists; exercise the schema rule directly.
    sqlx::query("DELETE FROM accounts WHERE account_id = $1")
        .bind(uuid::Uuid::parse_str(creator_id).unwrap())
        .execute(app.db.pool())
        .await
        .expect("Failed to delete account");

    // The invoice survives with its attribution cleared.
    let fetched = app.get_invoice(&token_a, invoice_id).await;
    assert!(fetched["created_by"].is_null());

    // B's activity entries survive as well, unattributed.
    let orphaned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE account_id IS NULL AND action = 'invoice.created'",
    )
    .fetch_one(app.db.pool())
    .await
    .expect("Failed to count activity");
    assert!(orphaned >= 1);

    app.cleanup().await;
}
