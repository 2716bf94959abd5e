//! Company CRUD endpoints. A company belongs to the authenticated account;
//! each account may own exactly one.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{CreateCompanyRequest, ListQuery, UpdateCompanyRequest};
use crate::handlers::log_activity;
use crate::middleware::AuthUser;
use crate::models::{Company, CreateCompany, UpdateCompany};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DEFAULT_PAGE_SIZE: i32 = 50;

pub async fn create_company(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let account_id = user
        .account_id()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Malformed principal id")))?;

    let company = state
        .db
        .create_company(&CreateCompany {
            account_id,
            name: req.name,
            address: req.address,
            gstin: req.gstin,
            email: req.email,
            phone: req.phone,
            logo_path: req.logo_path,
        })
        .await?;

    log_activity(
        &state,
        &user,
        "company.created",
        serde_json::json!({ "company_id": company.company_id, "name": company.name }),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_companies(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Company>>, AppError> {
    let companies = state
        .db
        .list_companies(query.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(companies))
}

pub async fn get_company(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    let company = state
        .db
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
    Ok(Json(company))
}

pub async fn update_company(
    State(state): State<AppState>,
    user: AuthUser,
    Path(company_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> Result<Json<Company>, AppError> {
    let company = state
        .db
        .update_company(
            company_id,
            &UpdateCompany {
                name: req.name,
                address: req.address,
                gstin: req.gstin,
                email: req.email,
                phone: req.phone,
                logo_path: req.logo_path,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    log_activity(
        &state,
        &user,
        "company.updated",
        serde_json::json!({ "company_id": company.company_id }),
    )
    .await?;

    Ok(Json(company))
}

/// Delete a company. Its bank details and invoices cascade away.
pub async fn delete_company(
    State(state): State<AppState>,
    user: AuthUser,
    Path(company_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_company(company_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Company not found")));
    }

    log_activity(
        &state,
        &user,
        "company.deleted",
        serde_json::json!({ "company_id": company_id }),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
