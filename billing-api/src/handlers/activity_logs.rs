//! Activity log endpoints. The log is append-only: entries can be created
//! and read, never updated or deleted through the API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::billing::{CreateActivityLogRequest, ListActivityQuery};
use crate::middleware::AuthUser;
use crate::models::{ActivityLog, NewActivityLog};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

const DEFAULT_PAGE_SIZE: i32 = 50;

/// Append a manual entry, attributed to the caller.
pub async fn create_activity_log(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateActivityLogRequest>,
) -> Result<(StatusCode, Json<ActivityLog>), AppError> {
    let entry = state
        .db
        .record_activity(&NewActivityLog {
            account_id: user.account_id(),
            action: req.action,
            metadata: req.metadata,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_activity_logs(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, AppError> {
    let entries = state
        .db
        .list_activity(
            query.account_id,
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(entries))
}

pub async fn get_activity_log(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(log_id): Path<Uuid>,
) -> Result<Json<ActivityLog>, AppError> {
    let entry = state
        .db
        .get_activity(log_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Activity entry not found")))?;
    Ok(Json(entry))
}
