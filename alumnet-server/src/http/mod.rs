//! HTTP layer: auth gate, database guard, error mapping, routes.

pub mod auth;
pub mod error;
pub mod guard;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, ServerConfig};
