//! alumnet-core: configuration and deployment model
//!
//! Shared by the server library and the CLI binary. Deliberately free of
//! I/O beyond environment lookups so either side can depend on it without
//! pulling in the web or database stacks.

pub mod config;

pub use config::{AppConfig, ConfigError, DeploymentMode, Environment};
