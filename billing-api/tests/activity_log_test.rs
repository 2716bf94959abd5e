//! Activity log behavior: mutations append entries, the log is append-only.

mod common;

use common::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn billing_mutations_append_activity_entries() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;

    app.create_client_fixture(&token).await;
    app.create_company_fixture(&token).await;

    let entries: Vec<Value> = app
        .client
        .get(format!("{}/api/activity-logs", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to list activity")
        .json()
        .await
        .expect("Invalid body");

    let actions: Vec<&str> = entries
        .iter()
        .filter_map(|e| e["action"].as_str())
        .collect();
    assert!(actions.contains(&"client.created"));
    assert!(actions.contains(&"company.created"));

    app.cleanup().await;
}

#[tokio::test]
async fn manual_entries_are_attributed_to_the_caller() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;

    let response = app
        .client
        .post(format!("{}/api/activity-logs", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "action": "export.ran",
            "metadata": { "format": "csv", "rows": 42 }
        }))
        .send()
        .await
        .expect("Failed to create entry");
    assert_eq!(response.status().as_u16(), 201);
    let entry: Value = response.json().await.expect("Invalid body");
    assert_eq!(entry["action"], "export.ran");
    assert!(entry["account_id"].as_str().is_some());
    assert_eq!(entry["metadata"]["rows"], 42);

    // Retrieve round trip.
    let log_id = entry["log_id"].as_str().unwrap();
    let fetched: Value = app
        .client
        .get(format!("{}/api/activity-logs/{}", app.address, log_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to get entry")
        .json()
        .await
        .expect("Invalid body");
    assert_eq!(fetched["log_id"], entry["log_id"]);

    app.cleanup().await;
}

#[tokio::test]
async fn activity_entries_cannot_be_updated_or_deleted() {
    let app = TestApp::spawn().await;
    let token = app.register_and_login().await;

    let entry: Value = app
        .client
        .post(format!("{}/api/activity-logs", app.address))
        .bearer_auth(&token)
        .json(&json!({ "action": "noop" }))
        .send()
        .await
        .expect("Failed to create entry")
        .json()
        .await
        .expect("Invalid body");
    let log_id = entry["log_id"].as_str().unwrap();

    // Neither route exists: the surface is append-only.
    let response = app
        .client
        .put(format!("{}/api/activity-logs/{}", app.address, log_id))
        .bearer_auth(&token)
        .json(&json!({ "action": "rewritten" }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(response.status().as_u16(), 405);

    let response = app
        .client
        .delete(format!("{}/api/activity-logs/{}", app.address, log_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(response.status().as_u16(), 405);

    app.cleanup().await;
}
