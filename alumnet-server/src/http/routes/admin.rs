//! Administrative overview, gated to admins by the role layer.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use sqlx::Row;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct Overview {
    pub user_count: i64,
    pub db_readiness: &'static str,
    pub db_connected_secs: Option<u64>,
}

/// GET /admin/overview
async fn overview(State(state): State<AppState>) -> Result<Json<Overview>, ApiError> {
    let pool = state.db().ensure_connection().await?;

    let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
        .fetch_one(&pool)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "user count query failed");
            ApiError::Internal
        })?;

    Ok(Json(Overview {
        user_count: row.get("count"),
        db_readiness: state.db().readiness().await.as_str(),
        db_connected_secs: state
            .db()
            .connected_since()
            .await
            .map(|age| age.as_secs()),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/overview", get(overview))
}
