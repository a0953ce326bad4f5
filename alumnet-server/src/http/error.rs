//! API error types with IntoResponse
//!
//! Every rejection renders as a JSON `{message}` body. The status split
//! is load-bearing for existing clients: missing or expired credentials
//! and unknown/inactive principals answer 401, while a token that fails
//! verification outright and a role mismatch answer 403.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::ConnectionError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No Authorization header (401)
    #[error("access token required")]
    TokenMissing,

    /// Token signature is fine but the expiry claim has passed (401)
    #[error("token expired")]
    TokenExpired,

    /// Token failed verification: bad signature, malformed (403)
    #[error("invalid token")]
    TokenInvalid,

    /// Verified token names a principal that does not exist (401)
    #[error("unknown principal")]
    UnknownPrincipal,

    /// Principal exists but is deactivated (401)
    #[error("account deactivated")]
    AccountInactive,

    /// Role gate reached with no authenticated principal (401)
    #[error("authentication required")]
    AuthRequired,

    /// Principal's role is not in the allowed set (403)
    #[error("insufficient permissions")]
    InsufficientRole,

    /// No database handle could be produced (500). `detail` is only
    /// populated outside production.
    #[error("database unavailable")]
    DbUnavailable { detail: Option<String> },

    /// Anything else (500, logged)
    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                json!({"message": "Access token required"}),
            ),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, json!({"message": "Token expired"})),
            Self::TokenInvalid => (StatusCode::FORBIDDEN, json!({"message": "Invalid token"})),
            Self::UnknownPrincipal => {
                (StatusCode::UNAUTHORIZED, json!({"message": "Invalid token"}))
            }
            Self::AccountInactive => (
                StatusCode::UNAUTHORIZED,
                json!({"message": "Account is deactivated"}),
            ),
            Self::AuthRequired => (
                StatusCode::UNAUTHORIZED,
                json!({"message": "Authentication required"}),
            ),
            Self::InsufficientRole => (
                StatusCode::FORBIDDEN,
                json!({"message": "Insufficient permissions"}),
            ),
            Self::DbUnavailable { detail } => {
                tracing::error!("refusing request: no database connection");
                let body = match detail {
                    Some(detail) => {
                        json!({"message": "Database connection failed", "error": detail})
                    }
                    None => json!({"message": "Database connection failed"}),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            Self::Internal => {
                tracing::error!("internal error surfaced to client");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"message": "Internal server error"}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConnectionError> for ApiError {
    fn from(_: ConnectionError) -> Self {
        // Cause already logged by the connection manager.
        Self::DbUnavailable { detail: None }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(source) => source.into(),
            other => {
                tracing::error!(error = %other, "principal lookup failed");
                Self::Internal
            }
        }
    }
}
