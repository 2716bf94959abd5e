use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RateLimitConfig {
    pub auth_attempts: u32,
    pub window_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("BILLING_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BILLING_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()?;

        let db_url = env::var("BILLING_DATABASE_URL").expect("BILLING_DATABASE_URL must be set");
        let max_connections = env::var("BILLING_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("BILLING_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let jwt_secret = env::var("BILLING_JWT_SECRET").expect("BILLING_JWT_SECRET must be set");
        let access_token_expiry_minutes = env::var("BILLING_ACCESS_TOKEN_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()?;
        let refresh_token_expiry_days = env::var("BILLING_REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()?;

        let auth_attempts = env::var("BILLING_AUTH_RATE_LIMIT_ATTEMPTS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()?;
        let window_seconds = env::var("BILLING_AUTH_RATE_LIMIT_WINDOW_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?;

        let log_level = env::var("BILLING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let otlp_endpoint = env::var("BILLING_OTLP_ENDPOINT").ok();

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            jwt: JwtConfig {
                secret: Secret::new(jwt_secret),
                access_token_expiry_minutes,
                refresh_token_expiry_days,
            },
            rate_limit: RateLimitConfig {
                auth_attempts,
                window_seconds,
            },
            service_name: "billing-api".to_string(),
            log_level,
            otlp_endpoint,
        })
    }
}
