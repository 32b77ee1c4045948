//! CLI command implementations.

pub mod fetch;
pub mod live;
pub mod recalc;
pub mod signals;
pub mod symbols;
pub mod validate;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use sync_config::{AppConfig, ExchangeSettings};
use sync_core::traits::{Clock, Presenter, SystemClock};
use sync_core::types::{FetchRequest, Symbol, Timeframe};
use sync_data::{BinanceExchange, CsvExchange, ExchangeRegistry, SimulatedExchange};
use sync_engine::SyncEngine;
use sync_signals::SignalPipeline;
use tracing::info;

use crate::cli::SourceArgs;

/// Exchange settings with the `--csv` override applied.
pub fn exchange_settings(source: &SourceArgs, config: &AppConfig) -> ExchangeSettings {
    let mut exchange = config.exchange.clone();
    if let Some(path) = &source.csv {
        exchange.csv_path = Some(path.display().to_string());
    }
    exchange
}

/// Registry with the Binance and simulated adapters, plus the CSV adapter
/// when a CSV path is configured.
pub fn build_registry(exchange: &ExchangeSettings, clock: Arc<dyn Clock>) -> Result<ExchangeRegistry> {
    let mut registry = ExchangeRegistry::new();

    let binance = BinanceExchange::new(exchange.binance_base_url.clone(), exchange.request_timeout())
        .context("Failed to create Binance client")?;
    registry.register(Arc::new(binance));
    registry.register(Arc::new(SimulatedExchange::with_clock("simulated", clock)));

    if let Some(path) = &exchange.csv_path {
        let symbol = Symbol::parse(&exchange.csv_symbol)?;
        let granularity: Timeframe = exchange
            .csv_granularity
            .parse()
            .map_err(anyhow::Error::msg)?;
        let csv = CsvExchange::open(path, symbol, granularity)
            .with_context(|| format!("Failed to load CSV data from {}", path))?;
        registry.register(Arc::new(csv));
    }

    info!(exchanges = ?registry.ids(), "Exchange registry ready");
    Ok(registry)
}

/// Engine over the configured adapters on the system clock.
pub fn build_engine(
    source: &SourceArgs,
    config: &AppConfig,
    presenter: Arc<dyn Presenter>,
) -> Result<Arc<SyncEngine>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = build_registry(&exchange_settings(source, config), clock.clone())?;
    let engine = SyncEngine::new(
        registry,
        SignalPipeline::default(),
        presenter,
        clock,
        config.rate.engine_settings(),
    );
    engine.set_live_updates(config.polling.live_updates);
    Ok(Arc::new(engine))
}

/// Request from the `[fetch]` defaults overridden by the command line.
pub fn build_request(source: &SourceArgs, config: &AppConfig) -> FetchRequest {
    let exchange_id = if source.csv.is_some() {
        "csv"
    } else {
        source
            .exchange
            .as_deref()
            .unwrap_or(&config.exchange.default_id)
    };

    let mut request = config.fetch.to_request(exchange_id);
    if source.csv.is_some() {
        request.symbol = config.exchange.csv_symbol.clone();
        request.granularity = config.exchange.csv_granularity.clone();
    }
    if let Some(symbol) = &source.symbol {
        request.symbol = symbol.clone();
    }
    if let Some(granularity) = &source.granularity {
        request.granularity = granularity.clone();
    }
    if let Some(limit) = source.limit {
        request.limit = limit;
    }
    if let Some(htf_limit) = source.htf_limit {
        request.htf_limit = htf_limit;
    }
    if source.htf {
        request.with_htf = true;
    }
    if source.latest {
        request.with_latest_candle = true;
    }
    if let Some(variant) = source.variant {
        request.signal_variant = variant;
    }
    request
}

/// Parse a CLI time: RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DD` (UTC
/// midnight) or Unix milliseconds.
pub fn parse_time(input: &str) -> Result<i64> {
    let input = input.trim();
    if let Ok(ms) = input.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Ok(t.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(t.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(t) = date.and_hms_opt(0, 0, 0) {
            return Ok(t.and_utc().timestamp_millis());
        }
    }
    bail!("Unrecognized time '{}'", input)
}

/// Parse an optional CLI window.
pub fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<(Option<i64>, Option<i64>)> {
    let start = start.map(parse_time).transpose()?;
    let end = end.map(parse_time).transpose()?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use sync_core::types::SignalVariant;

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(parse_time("1700000000000").unwrap(), 1_700_000_000_000);
        assert_eq!(parse_time("2024-01-01").unwrap(), 1_704_067_200_000);
        assert_eq!(parse_time("2024-01-01 01:00").unwrap(), 1_704_070_800_000);
        assert_eq!(parse_time("2024-01-01T01:00:00Z").unwrap(), 1_704_070_800_000);
        assert_eq!(parse_time("2024-01-01T02:00:00+01:00").unwrap(), 1_704_070_800_000);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_parse_window() {
        let (start, end) = parse_window(Some("2024-01-01"), None).unwrap();
        assert_eq!(start, Some(1_704_067_200_000));
        assert_eq!(end, None);
        assert!(parse_window(None, Some("soon")).is_err());
    }

    #[test]
    fn test_request_uses_config_defaults() {
        let config = AppConfig::default();
        let request = build_request(&SourceArgs::default(), &config);
        assert_eq!(request.exchange_id, "binance");
        assert_eq!(request.symbol, "BTC/USDT");
        assert_eq!(request.limit, 200);
        assert!(!request.with_htf);
    }

    #[test]
    fn test_request_overrides() {
        let config = AppConfig::default();
        let source = SourceArgs {
            exchange: Some("simulated".into()),
            symbol: Some("ETH/USDT".into()),
            granularity: Some("4h".into()),
            limit: Some(500),
            htf: true,
            variant: Some(SignalVariant::SmartMoney),
            ..SourceArgs::default()
        };
        let request = build_request(&source, &config);
        assert_eq!(request.exchange_id, "simulated");
        assert_eq!(request.granularity, "4h");
        assert_eq!(request.limit, 500);
        assert!(request.with_htf);
        assert_eq!(request.signal_variant, SignalVariant::SmartMoney);
    }

    #[test]
    fn test_csv_override_selects_csv_adapter() {
        let config = AppConfig::default();
        let source = SourceArgs {
            csv: Some(PathBuf::from("data/btc.csv")),
            ..SourceArgs::default()
        };
        let request = build_request(&source, &config);
        assert_eq!(request.exchange_id, "csv");
        assert_eq!(request.granularity, config.exchange.csv_granularity);
        assert_eq!(
            exchange_settings(&source, &config).csv_path.as_deref(),
            Some("data/btc.csv")
        );
    }

    #[test]
    fn test_registry_without_csv() {
        let registry = build_registry(&ExchangeSettings::default(), Arc::new(SystemClock)).unwrap();
        let ids = registry.ids();
        assert!(ids.contains(&"binance"));
        assert!(ids.contains(&"simulated"));
        assert!(!ids.contains(&"csv"));
    }
}
