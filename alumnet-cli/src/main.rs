//! alumnet - alumni network backend service
//!
//! `serve` runs the HTTP API; `db-check` dials the database once and
//! reports connection health.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "alumnet",
    author,
    version,
    about = "Alumni network backend service"
)]
struct Cli {
    /// Enable debug logging (sets RUST_LOG=debug if not already set)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Dial the database once and report connection health
    DbCheck(commands::db_check::DbCheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env never overrides variables already in the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(cli.debug)?;

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::DbCheck(args) => commands::db_check::run(args).await,
    }
}
