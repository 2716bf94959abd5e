//! Request/response shapes for the HTTP surface.

pub mod auth;
pub mod billing;

use serde::Serialize;

/// Minimal error body used by extractors that reject before the handler.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
