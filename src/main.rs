//! Candle synchronization CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use sync_config::load_config;
use sync_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Setup logging
    let log_level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.format == "json";
    let _log_guard = setup_logging(&log_level, json, config.logging.file.as_deref());

    // Execute command
    match cli.command {
        Commands::Fetch(args) => cli::commands::fetch::run(args, &config).await,
        Commands::Live(args) => cli::commands::live::run(args, &config).await,
        Commands::Recalc(args) => cli::commands::recalc::run(args, &config).await,
        Commands::Symbols(args) => cli::commands::symbols::run(args, &config).await,
        Commands::Signals => cli::commands::signals::run().await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, &config).await,
    }
}
