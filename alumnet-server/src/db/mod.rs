//! Database connection lifecycle.
//!
//! All access to the shared handle goes through
//! [`ConnectionManager::ensure_connection`]; nothing else in the crate
//! holds a pool reference across requests.

pub mod manager;
pub mod profile;
pub mod schema;

pub use manager::{
    ConnectionError, ConnectionEvent, ConnectionManager, Connector, PgConnector, Readiness,
};
pub use profile::ConnectionProfile;

/// The production manager: sqlx Postgres behind the lifecycle state machine.
pub type Database = ConnectionManager<PgConnector>;
