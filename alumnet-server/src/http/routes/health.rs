//! Health check endpoint, kept outside the auth and database guards.

use std::time::Instant;

use axum::{routing::get, Json, Router};
use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Anchored by `build_router` so uptime counts from boot, not from the
/// first probe.
pub(crate) static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub version: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: STARTED.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body.status, "OK");
        assert!(!body.timestamp.is_empty());
    }
}
