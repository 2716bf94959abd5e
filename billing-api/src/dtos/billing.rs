use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::Jurisdiction;

// -----------------------------------------------------------------------------
// Clients
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "contact_person is required"))]
    pub contact_person: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_pincode: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_pincode: Option<String>,
    pub gstin: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub website: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_pincode: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_pincode: Option<String>,
    pub gstin: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub website: Option<String>,
}

// -----------------------------------------------------------------------------
// Companies
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 20, message = "gstin is required"))]
    pub gstin: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 20))]
    pub gstin: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub logo_path: Option<String>,
}

// -----------------------------------------------------------------------------
// Bank details
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBankDetailRequest {
    pub company_id: Uuid,
    #[validate(length(min = 1, message = "account_name is required"))]
    pub account_name: String,
    #[validate(length(min = 1, max = 30, message = "account_number is required"))]
    pub account_number: String,
    #[validate(length(min = 1, max = 20, message = "ifsc_code is required"))]
    pub ifsc_code: String,
    #[validate(length(min = 1, message = "bank_name is required"))]
    pub bank_name: String,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateBankDetailRequest {
    pub account_name: Option<String>,
    #[validate(length(max = 30))]
    pub account_number: Option<String>,
    #[validate(length(max = 20))]
    pub ifsc_code: Option<String>,
    pub bank_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListBankDetailsQuery {
    pub company_id: Option<Uuid>,
    pub page_size: Option<i32>,
}

// -----------------------------------------------------------------------------
// Invoices
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    pub company_id: Uuid,
    #[validate(length(min = 1, max = 30, message = "invoice_number is required"))]
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Defaults to intra-state when omitted.
    pub jurisdiction: Option<Jurisdiction>,
    pub shipping_gstin: Option<String>,
    pub tds_percent: Option<Decimal>,
    pub discount_total: Option<Decimal>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_due_date: Option<NaiveDate>,
    pub authorized_signature: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateInvoiceRequest {
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

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

// -----------------------------------------------------------------------------
// Invoice items
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceItemRequest {
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(length(max = 20))]
    pub hsn_sac: Option<String>,
    pub quantity: i32,
    pub rate: Decimal,
    pub tax_percent: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateInvoiceItemRequest {
    pub description: Option<String>,
    #[validate(length(max = 20))]
    pub hsn_sac: Option<String>,
    pub quantity: Option<i32>,
    pub rate: Option<Decimal>,
    pub tax_percent: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub sort_order: Option<i32>,
}

// -----------------------------------------------------------------------------
// Payments
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[validate(length(min = 1, max = 50, message = "method is required"))]
    pub method: String,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdatePaymentRequest {
    pub amount: Option<Decimal>,
    pub payment_date: Option<NaiveDate>,
    #[validate(length(max = 50))]
    pub method: Option<String>,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

// -----------------------------------------------------------------------------
// Activity log
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActivityLogRequest {
    #[validate(length(min = 1, message = "action is required"))]
    pub action: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListActivityQuery {
    pub account_id: Option<Uuid>,
    pub page_size: Option<i32>,
}

/// Shared query shape for simple paged listings.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page_size: Option<i32>,
}
