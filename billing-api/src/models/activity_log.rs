//! Append-only activity record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One audit entry. Rows are created once and never mutated; the account
/// reference is nulled rather than cascaded when an account is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub log_id: Uuid,
    pub account_id: Option<Uuid>,
    pub action: String,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub account_id: Option<Uuid>,
    pub action: String,
    pub metadata: Option<serde_json::Value>,
}
