use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for token generation and validation. HS256 with a shared
/// secret: there is a single verifier, so no key distribution is needed.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (account ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

/// Claims for refresh tokens (long-lived). `jti` matches a database row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token pair returned on login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Generate an access token for an account.
    pub fn generate_access_token(
        &self,
        account_id: &str,
        email: &str,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: account_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok(token)
    }

    /// Generate a refresh token whose `jti` is the given database row id.
    pub fn generate_refresh_token(
        &self,
        account_id: &str,
        token_id: &str,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = RefreshTokenClaims {
            sub: account_id.to_string(),
            jti: token_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))?;

        Ok(token)
    }

    /// Generate both tokens plus the refresh row id to persist.
    pub fn generate_token_pair(
        &self,
        account_id: &str,
        email: &str,
    ) -> Result<(String, String, Uuid), anyhow::Error> {
        let access_token = self.generate_access_token(account_id, email)?;
        let refresh_token_id = Uuid::new_v4();
        let refresh_token =
            self.generate_refresh_token(account_id, &refresh_token_id.to_string())?;

        Ok((access_token, refresh_token, refresh_token_id))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<RefreshTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid refresh token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds, for the client.
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }

    /// Refresh token lifetime, for the persisted row's expiry column.
    pub fn refresh_token_expiry(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_service() -> JwtService {
        JwtService::new(&JwtConfig {
            secret: Secret::new("test-secret-for-unit-tests-only".to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        })
    }

    #[test]
    fn access_token_round_trip() {
        let service = test_service();
        let token = service
            .generate_access_token("acct_123", "test@example.com")
            .unwrap();

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, "acct_123");
        assert_eq!(claims.email, "test@example.com");
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn refresh_token_round_trip() {
        let service = test_service();
        let token = service
            .generate_refresh_token("acct_123", "row-id-1")
            .unwrap();

        let claims = service.validate_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, "acct_123");
        assert_eq!(claims.jti, "row-id-1");
    }

    #[test]
    fn token_pair_links_refresh_jti_to_row_id() {
        let service = test_service();
        let (access, refresh, row_id) = service
            .generate_token_pair("acct_123", "test@example.com")
            .unwrap();

        assert!(!access.is_empty());
        let claims = service.validate_refresh_token(&refresh).unwrap();
        assert_eq!(claims.jti, row_id.to_string());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = test_service();
        let token = service
            .generate_access_token("acct_123", "test@example.com")
            .unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(service.validate_access_token(&tampered).is_err());
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let service = JwtService::new(&JwtConfig {
            secret: Secret::new("another-secret".to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        });
        let token = test_service()
            .generate_access_token("acct_123", "test@example.com")
            .unwrap();
        assert!(service.validate_access_token(&token).is_err());
    }
}
