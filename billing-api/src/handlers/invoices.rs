//! Invoice CRUD and lifecycle endpoints.
//!
//! Creation snapshots the client's billing/shipping addresses onto the
//! invoice so later client edits never change historical documents.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{CreateInvoiceRequest, ListInvoicesQuery, UpdateInvoiceRequest};
use crate::handlers::log_activity;
use crate::middleware::AuthUser;
use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, Jurisdiction, ListInvoicesFilter, UpdateInvoice,
};
use crate::services::metrics::record_invoice_operation;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DEFAULT_PAGE_SIZE: i32 = 50;

pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let client = state
        .db
        .get_client(req.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;
    if state.db.get_company(req.company_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Company not found")));
    }

    let invoice = state
        .db
        .create_invoice(&CreateInvoice {
            client_id: req.client_id,
            company_id: req.company_id,
            invoice_number: req.invoice_number,
            issue_date: req.issue_date,
            due_date: req.due_date,
            jurisdiction: req.jurisdiction.unwrap_or(Jurisdiction::IntraState),
            billing_address: client.billing_address,
            billing_city: client.billing_city,
            billing_state: client.billing_state,
            billing_pincode: client.billing_pincode,
            shipping_address: client.shipping_address,
            shipping_city: client.shipping_city,
            shipping_state: client.shipping_state,
            shipping_pincode: client.shipping_pincode,
            shipping_gstin: req.shipping_gstin,
            tds_percent: req.tds_percent,
            discount_total: req.discount_total.unwrap_or(Decimal::ZERO),
            notes: req.notes,
            terms: req.terms,
            payment_due_date: req.payment_due_date,
            authorized_signature: req.authorized_signature,
            created_by: user.account_id(),
        })
        .await?;

    record_invoice_operation("created");
    log_activity(
        &state,
        &user,
        "invoice.created",
        serde_json::json!({
            "invoice_id": invoice.invoice_id,
            "invoice_number": invoice.invoice_number,
        }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let filter = ListInvoicesFilter {
        status: query.status.as_deref().map(InvoiceStatus::from_string),
        client_id: query.client_id,
        company_id: query.company_id,
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        page_token: query.page_token,
    };
    let invoices = state.db.list_invoices(&filter).await?;
    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    Ok(Json(invoice))
}

/// Update a draft invoice. Totals are recomputed atomically with the write.
pub async fn update_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .db
        .update_invoice(
            invoice_id,
            &UpdateInvoice {
                issue_date: req.issue_date,
                due_date: req.due_date,
                jurisdiction: req.jurisdiction,
                shipping_gstin: req.shipping_gstin,
                tds_percent: req.tds_percent,
                discount_total: req.discount_total,
                notes: req.notes,
                terms: req.terms,
                payment_due_date: req.payment_due_date,
                authorized_signature: req.authorized_signature,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    log_activity(
        &state,
        &user,
        "invoice.updated",
        serde_json::json!({ "invoice_id": invoice.invoice_id }),
    )
    .await?;

    Ok(Json(invoice))
}

/// Delete a draft invoice. Finalized/cancelled invoices are history and can
/// only be cancelled, never removed.
pub async fn delete_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_invoice(invoice_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Draft invoice not found"
        )));
    }

    record_invoice_operation("deleted");
    log_activity(
        &state,
        &user,
        "invoice.deleted",
        serde_json::json!({ "invoice_id": invoice_id }),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Finalize a draft invoice: refused when the item list is empty or the
/// subtotal is zero; afterwards items are frozen and payments may be taken.
pub async fn finalize_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .db
        .finalize_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    record_invoice_operation("finalized");
    log_activity(
        &state,
        &user,
        "invoice.finalized",
        serde_json::json!({
            "invoice_id": invoice.invoice_id,
            "invoice_number": invoice.invoice_number,
            "total": invoice.total,
        }),
    )
    .await?;

    Ok(Json(invoice))
}

/// Cancel a draft or finalized invoice. Cancelled is terminal.
pub async fn cancel_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .db
        .cancel_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    record_invoice_operation("cancelled");
    log_activity(
        &state,
        &user,
        "invoice.cancelled",
        serde_json::json!({ "invoice_id": invoice.invoice_id }),
    )
    .await?;

    Ok(Json(invoice))
}
