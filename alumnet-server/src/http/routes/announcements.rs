//! Public announcement feed. Anonymous callers see published items;
//! moderators and admins also see drafts.

use axum::extract::State;
use axum::{routing::get, Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::state::AppState;
use crate::store::{Principal, Role};

#[derive(Serialize)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// GET /announcements
async fn list(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    let include_drafts = principal
        .as_ref()
        .is_some_and(|ext| ext.0.role != Role::Alumni);

    let pool = state.db().ensure_connection().await?;

    let rows = sqlx::query(
        r#"
        SELECT id, title, body, published, created_at
        FROM announcements
        WHERE published OR $1
        ORDER BY created_at DESC
        LIMIT 50
        "#,
    )
    .bind(include_drafts)
    .fetch_all(&pool)
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "announcement query failed");
        ApiError::Internal
    })?;

    let items = rows
        .into_iter()
        .map(|row| Announcement {
            id: row.get("id"),
            title: row.get("title"),
            body: row.get("body"),
            published: row.get("published"),
            created_at: row.get("created_at"),
        })
        .collect();

    Ok(Json(items))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/announcements", get(list))
}
