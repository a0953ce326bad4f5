//! One-shot database diagnostic: dial with the configured deployment
//! profile, probe, and report timings.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use alumnet_core::{DeploymentMode, Environment};
use alumnet_server::db::{ConnectionProfile, Database, PgConnector};

/// Arguments for the db-check command
#[derive(Parser, Debug)]
pub struct DbCheckArgs {
    /// Database URL (overrides DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run(args: DbCheckArgs) -> Result<()> {
    let database_url = args
        .database_url
        .context("DATABASE_URL not set. Set via --database-url or the environment")?;

    let deployment = DeploymentMode::from_env()?;
    let environment = Environment::from_env();
    let profile = ConnectionProfile::for_mode(deployment, environment);

    println!("deployment: {}", deployment.as_str());
    println!(
        "pool:       max {} / min {}",
        profile.max_connections, profile.min_connections
    );

    let db = Database::new(PgConnector::new(&database_url), deployment, profile);

    let started = Instant::now();
    db.connect()
        .await
        .context("connection failed")?;
    println!("connect:    OK ({} ms)", started.elapsed().as_millis());

    let round_trip = db.probe().await.context("liveness probe failed")?;
    println!("probe:      OK ({} ms)", round_trip.as_millis());
    println!("readiness:  {}", db.readiness().await.as_str());

    db.close().await;
    Ok(())
}
