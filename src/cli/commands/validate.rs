//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use sync_config::AppConfig;

pub async fn run(config_path: &Path, config: &AppConfig) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);
    if !config_path.exists() {
        println!("File not found; using defaults and environment overrides");
    }

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        for problem in config.problems() {
            println!("  - {}", problem);
        }
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Default exchange: {}", config.exchange.default_id);
    println!("Default request: {} {} (limit {})", config.fetch.symbol, config.fetch.granularity, config.fetch.limit);
    println!("API plan: {:?}", config.rate.plan);
    println!("Provider backoff: {}s", config.rate.provider_backoff_secs);
    println!();
    println!("Effective configuration:");
    println!("{}", config.to_toml_string()?);

    Ok(())
}
