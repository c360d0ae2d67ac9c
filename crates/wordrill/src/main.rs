//! wordrill - Dictation review CLI
//!
//! Words missed in a dictation come back for review on an Ebbinghaus
//! schedule until they are mastered.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wordrill_core::{Config, ReviewService};

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("wordrill=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("wordrill {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    let service = ReviewService::open(config).context("Failed to open review database")?;

    // Execute command
    match cli.command {
        Commands::Pool(cmd) => commands::pool::execute(cmd, &service),
        Commands::Dictation(cmd) => commands::dictation::execute(cmd, &service),
        Commands::Review(cmd) => commands::review::execute(cmd, &service),
        Commands::Analyze { json } => commands::analyze::execute(json, &service),
        Commands::Schedule { state_id, days } => {
            commands::schedule::execute(&state_id, days, &service)
        }
        Commands::Stats { json, watch } => commands::stats::execute(json, watch, &service).await,
        Commands::Version => Ok(()),
    }
}
