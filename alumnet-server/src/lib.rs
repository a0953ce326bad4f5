//! alumnet-server: database lifecycle and authentication core for the
//! alumni network backend.
//!
//! Two components carry the real invariants here: the connection manager
//! (`db`) and the auth gate (`http::auth`). The route handlers are thin
//! glue over those.

pub mod db;
pub mod http;
pub mod state;
pub mod store;

pub use http::server::{build_router, run_server, ServerConfig};
pub use state::AppState;
