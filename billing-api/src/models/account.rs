//! Account model: the login principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating an account. The hash is produced by the auth service,
/// never taken from a request.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Server-side record backing a refresh token's `jti` claim.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub token_id: Uuid,
    pub account_id: Uuid,
    pub expires_utc: DateTime<Utc>,
    pub revoked: bool,
    pub created_utc: DateTime<Utc>,
    pub last_used_utc: Option<DateTime<Utc>>,
}
