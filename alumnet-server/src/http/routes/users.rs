//! Routes for the authenticated user's own record.

use axum::{routing::get, Extension, Json, Router};

use crate::state::AppState;
use crate::store::Principal;

/// GET /users/me - echo the authenticated principal.
async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/me", get(me))
}
