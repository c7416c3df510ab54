//! Transfer Counsel CLI
//!
//! Routes UC/CSU transfer questions to specialist counseling agents, with
//! circuit breakers, canned fallbacks, and persisted sessions.

use anyhow::Result;
use clap::Parser;

mod bootstrap;
mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, initialize telemetry, and run the command
    cli.execute().await
}
