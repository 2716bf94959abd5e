//! Company profile: the issuing side of an invoice, one per account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub address: String,
    pub gstin: String,
    pub email: String,
    pub phone: String,
    pub logo_path: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a company. `account_id` is taken from the
/// authenticated principal, not the request body.
#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub account_id: Uuid,
    pub name: String,
    pub address: String,
    pub gstin: String,
    pub email: String,
    pub phone: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub logo_path: Option<String>,
}
