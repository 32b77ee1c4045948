//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, ExchangeSettings, FetchSettings, LoggingConfig, PollingSettings,
    RateSettings, SymbolSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use thiserror::Error;

/// Prefix of environment overrides, e.g. `CANDLE_SYNC__FETCH__LIMIT=500`.
pub const ENV_PREFIX: &str = "CANDLE_SYNC";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from file and environment.
///
/// A missing file is not an error; defaults fill every absent key.
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

/// [`load_config`] followed by [`AppConfig::validate`].
pub fn load_validated(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = load_config(path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("candle-sync-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/candle-sync.toml")).unwrap();
        assert_eq!(config.app.name, "candle-sync");
        assert_eq!(config.exchange.default_id, "binance");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_temp(
            "overrides",
            r#"
[fetch]
symbol = "ETH/USDT"
limit = 500
with_htf = true
signal_variant = "smart_money"

[rate]
plan = "pro"
"#,
        );
        let config = load_validated(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.fetch.symbol, "ETH/USDT");
        assert_eq!(config.fetch.limit, 500);
        assert!(config.fetch.with_htf);
        assert_eq!(config.fetch.htf_limit, 60);
        assert_eq!(config.rate.plan, sync_core::types::ApiPlan::Pro);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = write_temp("invalid", "[fetch]\nlimit = 5000\n");
        let err = load_validated(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, SettingsError::Invalid(msg) if msg.contains("fetch.limit")));
    }
}
