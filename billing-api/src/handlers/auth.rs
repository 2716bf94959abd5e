//! Registration, login and token refresh endpoints.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use service_core::error::AppError;

use crate::dtos::auth::{LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// Register a new account. Duplicate email -> 409, missing/short fields are
/// rejected by the validator before this handler runs.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account_id: account.account_id,
            email: account.email,
            name: account.name,
        }),
    ))
}

/// Login with email and password -> access + refresh token pair.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth.login(req).await?;
    Ok((StatusCode::OK, Json(tokens)))
}

/// Exchange a valid refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.auth.refresh(req).await?;
    Ok((StatusCode::OK, Json(token)))
}
