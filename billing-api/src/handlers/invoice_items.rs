//! Invoice line item endpoints, nested under the owning invoice.
//!
//! Every mutation recomputes the invoice totals in the same transaction as
//! the write, so responses never show a stale total next to updated items.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{CreateInvoiceItemRequest, UpdateInvoiceItemRequest};
use crate::handlers::log_activity;
use crate::middleware::AuthUser;
use crate::models::{CreateInvoiceItem, InvoiceItem, UpdateInvoiceItem};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn add_invoice_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateInvoiceItemRequest>,
) -> Result<(StatusCode, Json<InvoiceItem>), AppError> {
    let item = state
        .db
        .add_invoice_item(&CreateInvoiceItem {
            invoice_id,
            description: req.description,
            hsn_sac: req.hsn_sac,
            quantity: req.quantity,
            rate: req.rate,
            tax_percent: req.tax_percent.unwrap_or(Decimal::ZERO),
            discount_percent: req.discount_percent.unwrap_or(Decimal::ZERO),
            sort_order: req.sort_order.unwrap_or(0),
        })
        .await?;

    log_activity(
        &state,
        &user,
        "invoice_item.added",
        serde_json::json!({ "invoice_id": invoice_id, "item_id": item.item_id }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_invoice_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<InvoiceItem>>, AppError> {
    if state.db.get_invoice(invoice_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }
    let items = state.db.list_invoice_items(invoice_id).await?;
    Ok(Json(items))
}

pub async fn get_invoice_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvoiceItem>, AppError> {
    let item = state
        .db
        .get_invoice_item(invoice_id, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice item not found")))?;
    Ok(Json(item))
}

pub async fn update_invoice_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateInvoiceItemRequest>,
) -> Result<Json<InvoiceItem>, AppError> {
    let item = state
        .db
        .update_invoice_item(
            invoice_id,
            item_id,
            &UpdateInvoiceItem {
                description: req.description,
                hsn_sac: req.hsn_sac,
                quantity: req.quantity,
                rate: req.rate,
                tax_percent: req.tax_percent,
                discount_percent: req.discount_percent,
                sort_order: req.sort_order,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice item not found")))?;

    log_activity(
        &state,
        &user,
        "invoice_item.updated",
        serde_json::json!({ "invoice_id": invoice_id, "item_id": item_id }),
    )
    .await?;

    Ok(Json(item))
}

pub async fn remove_invoice_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.remove_invoice_item(invoice_id, item_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Invoice item not found"
        )));
    }

    log_activity(
        &state,
        &user,
        "invoice_item.removed",
        serde_json::json!({ "invoice_id": invoice_id, "item_id": item_id }),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
