//! Deployment-mode connection parameter bundles.

use std::time::Duration;

use alumnet_core::{DeploymentMode, Environment};

/// Pool and timeout tunables for one deployment mode. These are fixed
/// bundles, not free-form configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller may wait for a connection from the pool. A short
    /// timeout makes callers fail fast instead of queueing while the pool
    /// reconnects.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Run the idempotent schema/index bootstrap after a successful dial.
    pub auto_schema: bool,
}

impl ConnectionProfile {
    pub fn for_mode(mode: DeploymentMode, environment: Environment) -> Self {
        match mode {
            DeploymentMode::Persistent => Self {
                max_connections: 10,
                min_connections: 2,
                acquire_timeout: Duration::from_secs(10),
                idle_timeout: Duration::from_secs(30),
                auto_schema: environment != Environment::Production,
            },
            // Minimal pool per invocation; slow cold starts are worse than
            // per-request dials, so schema bootstrap is never run here.
            DeploymentMode::Serverless => Self {
                max_connections: 1,
                min_connections: 0,
                acquire_timeout: Duration::from_secs(5),
                idle_timeout: Duration::from_secs(60),
                auto_schema: false,
            },
        }
    }
}
