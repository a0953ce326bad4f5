//! Pre-handler hook that refuses requests when no database handle can be
//! produced. Failures surface as a 5xx here rather than as a hung or
//! half-served request deeper in the stack.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use alumnet_core::Environment;

use crate::state::AppState;

use super::error::ApiError;

pub async fn ensure_database(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(err) = state.db().ensure_connection().await {
        let detail = match state.environment() {
            Environment::Development => Some(err.to_string()),
            Environment::Production => None,
        };
        return Err(ApiError::DbUnavailable { detail });
    }

    Ok(next.run(req).await)
}
