//! HTTP server command.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use alumnet_core::{AppConfig, DeploymentMode};
use alumnet_server::{run_server, AppState, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,
}

/// Run the HTTP server
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = AppConfig::from_env().context(
        "configuration error. DATABASE_URL and JWT_SECRET must be set \
         (via the environment or a .env file)",
    )?;

    let state = AppState::from_config(&config);

    // Persistent processes dial at boot so a bad URI fails loudly here
    // instead of on the first request. Serverless invocations stay lazy:
    // each request acquires its own freshly-probed handle.
    if config.deployment == DeploymentMode::Persistent {
        state
            .db()
            .connect()
            .await
            .context("initial database connection failed")?;
    }

    tracing::info!(
        mode = config.deployment.as_str(),
        env = config.environment.as_str(),
        "starting alumnet server on {}",
        args.bind
    );

    run_server(
        state,
        ServerConfig {
            bind_addr: args.bind,
            cors_permissive: args.cors_permissive,
        },
    )
    .await
    .context("server error")
}
