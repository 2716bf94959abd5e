//! Bank detail CRUD endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{
    CreateBankDetailRequest, ListBankDetailsQuery, UpdateBankDetailRequest,
};
use crate::handlers::log_activity;
use crate::middleware::AuthUser;
use crate::models::{BankDetail, CreateBankDetail, UpdateBankDetail};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DEFAULT_PAGE_SIZE: i32 = 50;

pub async fn create_bank_detail(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBankDetailRequest>,
) -> Result<(StatusCode, Json<BankDetail>), AppError> {
    let bank_detail = state
        .db
        .create_bank_detail(&CreateBankDetail {
            company_id: req.company_id,
            account_name: req.account_name,
            account_number: req.account_number,
            ifsc_code: req.ifsc_code,
            bank_name: req.bank_name,
        })
        .await?;

    log_activity(
        &state,
        &user,
        "bank_detail.created",
        serde_json::json!({ "bank_detail_id": bank_detail.bank_detail_id }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(bank_detail)))
}

pub async fn list_bank_details(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListBankDetailsQuery>,
) -> Result<Json<Vec<BankDetail>>, AppError> {
    let bank_details = state
        .db
        .list_bank_details(
            query.company_id,
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(bank_details))
}

pub async fn get_bank_detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(bank_detail_id): Path<Uuid>,
) -> Result<Json<BankDetail>, AppError> {
    let bank_detail = state
        .db
        .get_bank_detail(bank_detail_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bank detail not found")))?;
    Ok(Json(bank_detail))
}

pub async fn update_bank_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bank_detail_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBankDetailRequest>,
) -> Result<Json<BankDetail>, AppError> {
    let bank_detail = state
        .db
        .update_bank_detail(
            bank_detail_id,
            &UpdateBankDetail {
                account_name: req.account_name,
                account_number: req.account_number,
                ifsc_code: req.ifsc_code,
                bank_name: req.bank_name,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bank detail not found")))?;

    log_activity(
        &state,
        &user,
        "bank_detail.updated",
        serde_json::json!({ "bank_detail_id": bank_detail.bank_detail_id }),
    )
    .await?;

    Ok(Json(bank_detail))
}

pub async fn delete_bank_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bank_detail_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_bank_detail(bank_detail_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Bank detail not found")));
    }

    log_activity(
        &state,
        &user,
        "bank_detail.deleted",
        serde_json::json!({ "bank_detail_id": bank_detail_id }),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
