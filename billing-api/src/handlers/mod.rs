//! HTTP handlers, one module per entity. Every handler states its own
//! authorization (the `AuthUser` extractor) and validation (`ValidatedJson`
//! plus domain checks); nothing is inherited implicitly.

pub mod activity_logs;
pub mod auth;
pub mod bank_details;
pub mod clients;
pub mod companies;
pub mod invoice_items;
pub mod invoices;
pub mod payments;

use crate::middleware::AuthUser;
use crate::models::NewActivityLog;
use crate::startup::AppState;
use service_core::error::AppError;

/// Append an audit entry attributed to the authenticated account.
pub(crate) async fn log_activity(
    state: &AppState,
    user: &AuthUser,
    action: &str,
    metadata: serde_json::Value,
) -> Result<(), AppError> {
    state
        .db
        .record_activity(&NewActivityLog {
            account_id: user.account_id(),
            action: action.to_string(),
            metadata: Some(metadata),
        })
        .await?;
    Ok(())
}
