//! Configuration structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sync_core::types::{ApiPlan, FetchRequest, SignalVariant, Timeframe, HTF_LIMIT_RANGE};
use sync_data::{BootstrapPolicy, BINANCE_BASE_URL};
use sync_engine::EngineSettings;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub rate: RateSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub symbols: SymbolSettings,
}

impl AppConfig {
    /// Range and consistency problems, one message each. Empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            problems.push(format!("logging.level: unknown level '{}'", self.logging.level));
        }
        if !["pretty", "json"].contains(&self.logging.format.as_str()) {
            problems.push(format!("logging.format: expected 'pretty' or 'json', got '{}'", self.logging.format));
        }
        if self.exchange.default_id.trim().is_empty() {
            problems.push("exchange.default_id: must not be empty".to_string());
        }
        if self.exchange.request_timeout_secs == 0 {
            problems.push("exchange.request_timeout_secs: must be positive".to_string());
        }
        if self.fetch.granularity.parse::<Timeframe>().is_err() {
            problems.push(format!("fetch.granularity: unknown granularity '{}'", self.fetch.granularity));
        }
        if !(200..=1000).contains(&self.fetch.limit) {
            problems.push(format!("fetch.limit: must be between 200 and 1000, got {}", self.fetch.limit));
        }
        let (htf_min, htf_max) = HTF_LIMIT_RANGE;
        if !(htf_min..=htf_max).contains(&self.fetch.htf_limit) {
            problems.push(format!(
                "fetch.htf_limit: must be between {} and {}, got {}",
                htf_min, htf_max, self.fetch.htf_limit
            ));
        }
        if self.fetch.trade_size <= Decimal::ZERO {
            problems.push("fetch.trade_size: must be positive".to_string());
        }
        if self.fetch.fee_percent < Decimal::ZERO {
            problems.push("fetch.fee_percent: cannot be negative".to_string());
        }
        if self.symbols.bootstrap_attempts == 0 {
            problems.push("symbols.bootstrap_attempts: must be at least 1".to_string());
        }

        problems
    }

    /// Fail with every problem found.
    pub fn validate(&self) -> Result<(), crate::SettingsError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(crate::SettingsError::Invalid(problems.join("; ")))
        }
    }

    /// Effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "candle-sync".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Exchange adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    /// Adapter used when a command names none
    pub default_id: String,
    pub binance_base_url: String,
    pub request_timeout_secs: u64,
    /// CSV file served by the `csv` adapter
    pub csv_path: Option<String>,
    pub csv_symbol: String,
    pub csv_granularity: String,
}

impl ExchangeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            default_id: "binance".to_string(),
            binance_base_url: BINANCE_BASE_URL.to_string(),
            request_timeout_secs: 10,
            csv_path: None,
            csv_symbol: "BTC/USDT".to_string(),
            csv_granularity: "1h".to_string(),
        }
    }
}

/// Defaults of a fetch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub symbol: String,
    pub granularity: String,
    pub limit: u32,
    pub htf_limit: u32,
    pub trade_size: Decimal,
    pub fee_percent: Decimal,
    pub with_htf: bool,
    pub with_latest_candle: bool,
    pub signal_variant: SignalVariant,
}

impl FetchSettings {
    /// Request for `exchange_id` carrying these defaults.
    pub fn to_request(&self, exchange_id: &str) -> FetchRequest {
        FetchRequest::new(exchange_id, self.symbol.clone(), self.granularity.clone())
            .with_limit(self.limit)
            .with_htf_limit(self.htf_limit)
            .with_trade_size(self.trade_size)
            .with_fee_percent(self.fee_percent)
            .with_htf(self.with_htf)
            .with_latest_candle(self.with_latest_candle)
            .with_signal_variant(self.signal_variant)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            symbol: "BTC/USDT".to_string(),
            granularity: "1h".to_string(),
            limit: 200,
            htf_limit: 60,
            trade_size: dec!(100),
            fee_percent: dec!(0.1),
            with_htf: false,
            with_latest_candle: false,
            signal_variant: SignalVariant::Standard,
        }
    }
}

/// Rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSettings {
    pub plan: ApiPlan,
    /// Pause after a provider 429
    pub provider_backoff_secs: u64,
    /// Added to local rate-limit waits
    pub slack_ms: u64,
}

impl RateSettings {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            plan: self.plan,
            provider_backoff: Duration::from_secs(self.provider_backoff_secs),
            rate_slack: Duration::from_millis(self.slack_ms),
        }
    }
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            plan: ApiPlan::Enterprise,
            provider_backoff_secs: 60,
            slack_ms: 10,
        }
    }
}

/// Real-time polling toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub live_updates: bool,
    /// Start `live` in backtest (ticker-only) mode
    pub backtest: bool,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            live_updates: true,
            backtest: false,
        }
    }
}

/// Symbol cache bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolSettings {
    pub bootstrap_attempts: u32,
    pub bootstrap_backoff_ms: u64,
}

impl SymbolSettings {
    pub fn policy(&self) -> BootstrapPolicy {
        BootstrapPolicy {
            max_attempts: self.bootstrap_attempts,
            initial_backoff: Duration::from_millis(self.bootstrap_backoff_ms),
        }
    }
}

impl Default for SymbolSettings {
    fn default() -> Self {
        Self {
            bootstrap_attempts: 5,
            bootstrap_backoff_ms: 500,
        }
    }
}
