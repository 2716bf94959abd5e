//! Registration, login and token refresh.
//!
//! Handlers stay thin; credential checks and refresh-token bookkeeping live
//! here. Token mechanics themselves are delegated to [`JwtService`].

use chrono::Utc;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dtos::auth::{AccessTokenResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::models::{Account, NewAccount};
use crate::services::metrics::record_auth_attempt;
use crate::services::{Database, JwtService, TokenResponse};
use crate::utils::{hash_password, verify_password};

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(db: Database, jwt: JwtService) -> Self {
        Self { db, jwt }
    }

    /// Create an account. Field presence and shape are checked by the
    /// request validator; the unique-email rule surfaces as Conflict.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<Account, AppError> {
        let password_hash = hash_password(&req.password).map_err(AppError::InternalError)?;

        let account = match self
            .db
            .create_account(&NewAccount {
                email: req.email.trim().to_lowercase(),
                name: req.name.trim().to_string(),
                password_hash,
            })
            .await
        {
            Ok(account) => account,
            Err(e) => {
                record_auth_attempt("register", "failure");
                return Err(e);
            }
        };

        record_auth_attempt("register", "success");
        info!(account_id = %account.account_id, "Account registered");

        Ok(account)
    }

    /// Verify credentials and issue an access/refresh token pair.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, AppError> {
        let account = self
            .db
            .get_account_by_email(req.email.trim().to_lowercase().as_str())
            .await?;

        let account = match account {
            Some(account) => account,
            None => {
                record_auth_attempt("login", "failure");
                return Err(AppError::AuthError(anyhow::anyhow!("Invalid credentials")));
            }
        };

        if verify_password(&req.password, &account.password_hash).is_err() {
            record_auth_attempt("login", "failure");
            return Err(AppError::AuthError(anyhow::anyhow!("Invalid credentials")));
        }

        if !account.is_active {
            record_auth_attempt("login", "failure");
            return Err(AppError::AuthError(anyhow::anyhow!("Account is disabled")));
        }

        let account_id = account.account_id.to_string();
        let (access_token, refresh_token, refresh_token_id) = self
            .jwt
            .generate_token_pair(&account_id, &account.email)
            .map_err(AppError::InternalError)?;

        let expires_utc = Utc::now() + self.jwt.refresh_token_expiry();
        self.db
            .insert_refresh_token(refresh_token_id, account.account_id, expires_utc)
            .await?;

        record_auth_attempt("login", "success");
        info!(account_id = %account.account_id, "Login succeeded");

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }

    /// Exchange a valid refresh token for a new access token.
    #[instrument(skip(self, req))]
    pub async fn refresh(&self, req: RefreshRequest) -> Result<AccessTokenResponse, AppError> {
        let claims = self
            .jwt
            .validate_refresh_token(&req.refresh_token)
            .map_err(AppError::AuthError)?;

        let token_id = Uuid::parse_str(&claims.jti)
            .map_err(|_| AppError::AuthError(anyhow::anyhow!("Malformed refresh token")))?;

        let record = self
            .db
            .get_refresh_token(token_id)
            .await?
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Unknown refresh token")))?;

        if record.revoked {
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Refresh token has been revoked"
            )));
        }
        if record.expires_utc < Utc::now() {
            return Err(AppError::AuthError(anyhow::anyhow!(
                "Refresh token has expired"
            )));
        }

        let account = self
            .db
            .get_account(record.account_id)
            .await?
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Account no longer exists")))?;
        if !account.is_active {
            return Err(AppError::AuthError(anyhow::anyhow!("Account is disabled")));
        }

        self.db.touch_refresh_token(token_id).await?;

        let access_token = self
            .jwt
            .generate_access_token(&account.account_id.to_string(), &account.email)
            .map_err(AppError::InternalError)?;

        Ok(AccessTokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }
}
