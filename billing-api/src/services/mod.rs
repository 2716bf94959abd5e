//! Services module for billing-api.

pub mod auth;
pub mod database;
pub mod jwt;
pub mod metrics;

pub use auth::AuthService;
pub use database::Database;
pub use jwt::{AccessTokenClaims, JwtService, TokenResponse};
pub use metrics::{
    get_metrics, init_metrics, record_auth_attempt, record_invoice_operation,
    record_payment_operation,
};
