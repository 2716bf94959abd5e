use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::services::AccessTokenClaims;
use crate::startup::AppState;
use service_core::error::AppError;

/// Middleware requiring a valid bearer token. Claims are stored in request
/// extensions for the [`AuthUser`] extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Missing or invalid Authorization header"
            )));
        }
    };

    let claims = state
        .jwt
        .validate_access_token(token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token")))?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor giving handlers the authenticated principal.
pub struct AuthUser(pub AccessTokenClaims);

impl AuthUser {
    /// Account ID from the token's subject claim.
    pub fn account_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.0.sub).ok()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<AccessTokenClaims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser(claims.clone()))
    }
}
