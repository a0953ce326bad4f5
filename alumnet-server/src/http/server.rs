//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C, closing the database handle
//!   on the way out
//!
//! Middleware stacking, outermost first: database guard, then
//! authentication, then (for admin routes) the role gate.

use std::net::SocketAddr;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::{Json, Router};
use once_cell::sync::Lazy;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::store::Role;

use super::routes::{admin, announcements, health, users};
use super::{auth, guard};

/// Roles allowed through the admin gate.
const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            cors_permissive: false,
        }
    }
}

/// Build the application router with all routes and gate layers.
pub fn build_router(state: AppState) -> Router {
    // Anchor the uptime clock at boot.
    Lazy::force(&health::STARTED);

    let protected = users::router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::authenticate_token,
    ));

    // Layers run bottom-up: authentication first, then the role gate.
    let admin = admin::router()
        .layer(middleware::from_fn(|req: Request, next: Next| {
            auth::require_role(ADMIN_ROLES, req, next)
        }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate_token,
        ));

    let public = announcements::router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::optional_auth,
    ));

    let api = Router::new()
        .merge(protected)
        .merge(admin)
        .merge(public)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::ensure_database,
        ))
        // Health stays reachable with the database down.
        .merge(health::router());

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON 404 for anything outside the routing table.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Route not found"})),
    )
}

/// Run the HTTP server. Blocks until shutdown, then closes the shared
/// database handle.
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let cors = if config.cors_permissive {
        tracing::warn!("CORS: permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        // Localhost only
        CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = build_router(state.clone()).layer(cors);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db().close().await;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
