//! Payment endpoints, nested under the owning invoice.
//!
//! Every mutation recomputes the invoice balance in the same transaction.
//! Overpayment is legal and drives the balance negative; it is never
//! clamped or rejected.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{CreatePaymentRequest, UpdatePaymentRequest};
use crate::handlers::log_activity;
use crate::middleware::AuthUser;
use crate::models::{CreatePayment, Payment, UpdatePayment};
use crate::services::metrics::record_payment_operation;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment = state
        .db
        .record_payment(&CreatePayment {
            invoice_id,
            amount: req.amount,
            payment_date: req.payment_date,
            method: req.method,
            reference: req.reference,
        })
        .await?;

    record_payment_operation("recorded");
    log_activity(
        &state,
        &user,
        "payment.recorded",
        serde_json::json!({
            "invoice_id": invoice_id,
            "payment_id": payment.payment_id,
            "amount": payment.amount,
        }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    if state.db.get_invoice(invoice_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }
    let payments = state.db.list_payments(invoice_id).await?;
    Ok(Json(payments))
}

pub async fn get_payment(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((invoice_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Payment>, AppError> {
    let payment = state
        .db
        .get_payment(invoice_id, payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;
    Ok(Json(payment))
}

pub async fn update_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((invoice_id, payment_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentRequest>,
) -> Result<Json<Payment>, AppError> {
    let payment = state
        .db
        .update_payment(
            invoice_id,
            payment_id,
            &UpdatePayment {
                amount: req.amount,
                payment_date: req.payment_date,
                method: req.method,
                reference: req.reference,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

    record_payment_operation("updated");
    log_activity(
        &state,
        &user,
        "payment.updated",
        serde_json::json!({ "invoice_id": invoice_id, "payment_id": payment_id }),
    )
    .await?;

    Ok(Json(payment))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((invoice_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_payment(invoice_id, payment_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Payment not found")));
    }

    record_payment_operation("deleted");
    log_activity(
        &state,
        &user,
        "payment.deleted",
        serde_json::json!({ "invoice_id": invoice_id, "payment_id": payment_id }),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
