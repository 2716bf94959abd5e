//! Invoice lifecycle and total recomputation tests.

mod common;

use common::{TestApp, dec_field};
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

async fn setup(app: &TestApp) -> (String, String, String) {
    let token = app.register_and_login().await;
    let client = app.create_client_fixture(&token).await;
    let company = app.create_company_fixture(&token).await;
    (
        token,
        client["client_id"].as_str().unwrap().to_string(),
        company["company_id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn create_invoice_snapshots_client_address() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;

    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-1001")
        .await;

    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["billing_city"], "Pune");
    assert_eq!(invoice["shipping_address"], "Warehouse 4, MIDC");
    assert_eq!(dec_field(&invoice, "subtotal"), Decimal::ZERO);
    assert_eq!(dec_field(&invoice, "balance_due"), Decimal::ZERO);

    // Later client edits must not touch the snapshot.
    let response = app
        .client
        .put(format!("{}/api/clients/{}", app.address, client_id))
        .bearer_auth(&token)
        .json(&json!({ "billing_city": "Nashik" }))
        .send()
        .await
        .expect("Failed to update client");
    assert_eq!(response.status().as_u16(), 200);

    let invoice_id = invoice["invoice_id"].as_str().unwrap();
    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(fetched["billing_city"], "Pune");

    app.cleanup().await;
}

#[tokio::test]
async fn duplicate_invoice_number_conflicts_and_persists_nothing() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;

    app.create_invoice_fixture(&token, &client_id, &company_id, "INV-2001")
        .await;

    let response = app
        .client
        .post(format!("{}/api/invoices", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "client_id": client_id,
            "company_id": company_id,
            "invoice_number": "INV-2001",
            "issue_date": "2026-07-01",
            "due_date": "2026-07-31"
        }))
        .send()
        .await
        .expect("Failed to create invoice");
    assert_eq!(response.status().as_u16(), 409);

    let invoices: Vec<Value> = app
        .client
        .get(format!("{}/api/invoices", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list invoices")
        .json()
        .await
        .expect("Invalid list body");
    assert_eq!(invoices.len(), 1);

    app.cleanup().await;
}

#[tokio::test]
async fn adding_items_recomputes_totals_in_response_path() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-3001")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    // qty=2, rate=500.00, tax=18%, discount=10% -> base 900.00, amount 1062.00
    let response = app
        .client
        .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({
            "description": "Design retainer",
            "hsn_sac": "998391",
            "quantity": 2,
            "rate": "500.00",
            "tax_percent": "18",
            "discount_percent": "10"
        }))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(response.status().as_u16(), 201);
    let item: Value = response.json().await.expect("Invalid item body");
    assert_eq!(dec_field(&item, "amount"), dec("1062.00"));

    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(dec_field(&fetched, "subtotal"), dec("900.00"));
    assert_eq!(dec_field(&fetched, "cgst"), dec("81.00"));
    assert_eq!(dec_field(&fetched, "sgst"), dec("81.00"));
    assert_eq!(dec_field(&fetched, "igst"), Decimal::ZERO);
    assert_eq!(dec_field(&fetched, "total"), dec("1062.00"));
    assert_eq!(dec_field(&fetched, "balance_due"), dec("1062.00"));

    // Removing the item returns the totals to zero.
    let item_id = item["item_id"].as_str().unwrap();
    let response = app
        .client
        .delete(format!(
            "{}/api/invoices/{}/items/{}",
            app.address, invoice_id, item_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to remove item");
    assert_eq!(response.status().as_u16(), 204);

    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(dec_field(&fetched, "subtotal"), Decimal::ZERO);
    assert_eq!(dec_field(&fetched, "total"), Decimal::ZERO);

    app.cleanup().await;
}

#[tokio::test]
async fn item_validation_rejects_out_of_range_values() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-3501")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    for payload in [
        json!({ "description": "bad", "quantity": -1, "rate": "10.00" }),
        json!({ "description": "bad", "quantity": 1, "rate": "-10.00" }),
        json!({ "description": "bad", "quantity": 1, "rate": "10.00", "tax_percent": "101" }),
        json!({ "description": "bad", "quantity": 1, "rate": "10.00", "discount_percent": "-5" }),
    ] {
        let response = app
            .client
            .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .expect("Failed to post item");
        assert_eq!(response.status().as_u16(), 400, "payload: {}", payload);
    }

    app.cleanup().await;
}

#[tokio::test]
async fn finalize_requires_items() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-4001")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .client
        .post(format!(
            "{}/api/invoices/{}/finalize",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to finalize");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn finalized_invoice_freezes_items_and_accepts_payments() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-5001")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    app.client
        .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({
            "description": "Consulting",
            "quantity": 2,
            "rate": "500.00",
            "tax_percent": "18",
            "discount_percent": "10"
        }))
        .send()
        .await
        .expect("Failed to add item");

    // Payments against a draft are refused.
    let response = app
        .client
        .post(format!(
            "{}/api/invoices/{}/payments",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "amount": "100.00", "payment_date": "2026-07-05", "method": "upi" }))
        .send()
        .await
        .expect("Failed to post payment");
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .post(format!(
            "{}/api/invoices/{}/finalize",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to finalize");
    assert_eq!(response.status().as_u16(), 200);
    let finalized: Value = response.json().await.expect("Invalid body");
    assert_eq!(finalized["status"], "finalized");
    assert_eq!(dec_field(&finalized, "total"), dec("1062.00"));

    // Items are frozen now.
    let response = app
        .client
        .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({ "description": "Extra", "quantity": 1, "rate": "10.00" }))
        .send()
        .await
        .expect("Failed to post item");
    assert_eq!(response.status().as_u16(), 400);

    // Payment reduces the balance; removing it restores the prior value.
    let response = app
        .client
        .post(format!(
            "{}/api/invoices/{}/payments",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "amount": "1000.00", "payment_date": "2026-07-10", "method": "bank_transfer", "reference": "UTR-778" }))
        .send()
        .await
        .expect("Failed to post payment");
    assert_eq!(response.status().as_u16(), 201);
    let payment: Value = response.json().await.expect("Invalid payment body");

    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(dec_field(&fetched, "balance_due"), dec("62.00"));

    let payment_id = payment["payment_id"].as_str().unwrap();
    let response = app
        .client
        .delete(format!(
            "{}/api/invoices/{}/payments/{}",
            app.address, invoice_id, payment_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete payment");
    assert_eq!(response.status().as_u16(), 204);

    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(dec_field(&fetched, "balance_due"), dec("1062.00"));

    app.cleanup().await;
}

#[tokio::test]
async fn overpayment_drives_balance_negative() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-6001")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    app.client
        .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({ "description": "Work", "quantity": 1, "rate": "100.00" }))
        .send()
        .await
        .expect("Failed to add item");
    app.client
        .post(format!(
            "{}/api/invoices/{}/finalize",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to finalize");

    let response = app
        .client
        .post(format!(
            "{}/api/invoices/{}/payments",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .json(&json!({ "amount": "150.00", "payment_date": "2026-07-10", "method": "cash" }))
        .send()
        .await
        .expect("Failed to post payment");
    assert_eq!(response.status().as_u16(), 201);

    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(dec_field(&fetched, "balance_due"), dec("-50.00"));

    app.cleanup().await;
}

#[tokio::test]
async fn status_transitions_are_enforced() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-7001")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    app.client
        .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({ "description": "Work", "quantity": 1, "rate": "100.00" }))
        .send()
        .await
        .expect("Failed to add item");

    // draft -> cancelled
    let response = app
        .client
        .post(format!("{}/api/invoices/{}/cancel", app.address, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to cancel");
    assert_eq!(response.status().as_u16(), 200);

    // cancelled -> finalized is rejected
    let response = app
        .client
        .post(format!(
            "{}/api/invoices/{}/finalize",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to finalize");
    assert_eq!(response.status().as_u16(), 400);

    // cancelled -> cancelled is rejected too
    let response = app
        .client
        .post(format!("{}/api/invoices/{}/cancel", app.address, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to cancel");
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn updates_to_finalized_invoices_are_rejected() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-8001")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    app.client
        .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({ "description": "Work", "quantity": 1, "rate": "100.00" }))
        .send()
        .await
        .expect("Failed to add item");
    app.client
        .post(format!(
            "{}/api/invoices/{}/finalize",
            app.address, invoice_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to finalize");

    let response = app
        .client
        .put(format!("{}/api/invoices/{}", app.address, invoice_id))
        .bearer_auth(&token)
        .json(&json!({ "notes": "editing history" }))
        .send()
        .await
        .expect("Failed to update");
    assert_eq!(response.status().as_u16(), 400);

    // Finalized invoices cannot be deleted either.
    let response = app
        .client
        .delete(format!("{}/api/invoices/{}", app.address, invoice_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to delete");
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_item_writes_serialize_without_lost_updates() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;
    let invoice = app
        .create_invoice_fixture(&token, &client_id, &company_id, "INV-RACE-1")
        .await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = app.client.clone();
        let url = format!("{}/api/invoices/{}/items", app.address, invoice_id);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let response = client
                .post(url)
                .bearer_auth(token)
                .json(&json!({
                    "description": format!("Line {}", i),
                    "quantity": 1,
                    "rate": "10.00"
                }))
                .send()
                .await
                .expect("Failed to add item");
            assert_eq!(response.status().as_u16(), 201);
        }));
    }
    for handle in handles {
        handle.await.expect("writer task panicked");
    }

    let fetched = app.get_invoice(&token, &invoice_id).await;
    assert_eq!(dec_field(&fetched, "subtotal"), dec("80.00"));
    assert_eq!(dec_field(&fetched, "total"), dec("80.00"));

    app.cleanup().await;
}

#[tokio::test]
async fn tds_and_discount_overrides_flow_into_totals() {
    let app = TestApp::spawn().await;
    let (token, client_id, company_id) = setup(&app).await;

    let response = app
        .client
        .post(format!("{}/api/invoices", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "client_id": client_id,
            "company_id": company_id,
            "invoice_number": "INV-9001",
            "issue_date": "2026-07-01",
            "due_date": "2026-07-31",
            "tds_percent": "5"
        }))
        .send()
        .await
        .expect("Failed to create invoice");
    assert_eq!(response.status().as_u16(), 201);
    let invoice: Value = response.json().await.expect("Invalid body");
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    // Two lines of base 900.00 / tax 162.00 each.
    for _ in 0..2 {
        app.client
            .post(format!("{}/api/invoices/{}/items", app.address, invoice_id))
            .bearer_auth(&token)
            .json(&json!({
                "description": "Retainer",
                "quantity": 2,
                "rate": "500.00",
                "tax_percent": "18",
                "discount_percent": "10"
            }))
            .send()
            .await
            .expect("Failed to add item");
    }

    let fetched = app.get_invoice(&token, invoice_id).await;
    assert_eq!(dec_field(&fetched, "subtotal"), dec("1800.00"));
    assert_eq!(dec_field(&fetched, "cgst"), dec("162.00"));
    assert_eq!(dec_field(&fetched, "sgst"), dec("162.00"));
    assert_eq!(dec_field(&fetched, "tds"), dec("90.00"));
    assert_eq!(dec_field(&fetched, "total"), dec("2034.00"));

    app.cleanup().await;
}
