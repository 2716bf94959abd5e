//! Invoice model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Finalized,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Finalized => "finalized",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "finalized" => InvoiceStatus::Finalized,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }
}

/// Tax jurisdiction of an invoice. Intra-state splits GST evenly into
/// CGST and SGST; inter-state charges the full rate as IGST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    IntraState,
    InterState,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::IntraState => "intra_state",
            Jurisdiction::InterState => "inter_state",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "inter_state" => Jurisdiction::InterState,
            _ => Jurisdiction::IntraState,
        }
    }
}

/// Invoice record. Addresses are a snapshot copied from the client at
/// creation time; later client edits never change historical invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub company_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub jurisdiction: String,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_pincode: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_pincode: Option<String>,
    pub shipping_gstin: Option<String>,
    pub subtotal: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub tds: Decimal,
    pub tds_percent: Option<Decimal>,
    pub discount_total: Decimal,
    pub total: Decimal,
    pub balance_due: Decimal,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub authorized_signature: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub finalized_utc: Option<DateTime<Utc>>,
    pub cancelled_utc: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn status_enum(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    pub fn jurisdiction_enum(&self) -> Jurisdiction {
        Jurisdiction::from_string(&self.jurisdiction)
    }
}

/// Input for creating an invoice. Address fields hold the snapshot taken
/// from the client; `created_by` is the authenticated principal.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub client_id: Uuid,
    pub company_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub jurisdiction: Jurisdiction,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_pincode: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_pincode: Option<String>,
    pub shipping_gstin: Option<String>,
    pub tds_percent: Option<Decimal>,
    pub discount_total: Decimal,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub authorized_signature: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Input for updating a draft invoice.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub jurisdiction: Option<Jurisdiction>,
    pub shipping_gstin: Option<String>,
    pub tds_percent: Option<Decimal>,
    pub discount_total: Option<Decimal>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub authorized_signature: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}
