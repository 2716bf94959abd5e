//! Line item on an invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single invoice line. `amount` is stored tax-inclusive and
/// post-discount; the total engine derives it, it is never client-supplied.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub item_id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub hsn_sac: Option<String>,
    pub quantity: i32,
    pub rate: Decimal,
    pub tax_percent: Decimal,
    pub discount_percent: Decimal,
    pub amount: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInvoiceItem {
    pub invoice_id: Uuid,
    pub description: String,
    pub hsn_sac: Option<String>,
    pub quantity: i32,
    pub rate: Decimal,
    pub tax_percent: Decimal,
    pub discount_percent: Decimal,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceItem {
    pub description: Option<String>,
    pub hsn_sac: Option<String>,
    pub quantity: Option<i32>,
    pub rate: Option<Decimal>,
    pub tax_percent: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub sort_order: Option<i32>,
}
