//! Status and notification texts.

use chrono::{TimeZone, Utc};
use sync_core::types::SignalResult;

/// `Processed N candles for SYMBOL (GRAN)`, plus the HTF count when HTF
/// candles exist.
pub fn processed_status(
    symbol: &str,
    granularity: &str,
    base_count: usize,
    htf: Option<(&str, usize, u32)>,
) -> String {
    let mut status = format!("Processed {} candles for {} ({})", base_count, symbol, granularity);
    if let Some((htf_granularity, htf_count, htf_limit)) = htf.filter(|(_, n, _)| *n > 0) {
        status.push_str(&format!(
            " and {} for {} (HTF limit: {})",
            htf_count, htf_granularity, htf_limit
        ));
    }
    status
}

/// Text of a real-time signal notification.
pub fn notification_text(
    symbol: &str,
    exchange: &str,
    granularity: &str,
    at_ms: i64,
    signal: &SignalResult,
    htf: Option<(&str, &SignalResult)>,
) -> String {
    let time = Utc
        .timestamp_millis_opt(at_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| at_ms.to_string());
    let mut text = format!(
        "Signal for {} on {} ({}) at {}: {} ({})",
        symbol, exchange, granularity, time, signal.signal_type, signal.strength
    );
    if let Some((htf_granularity, htf_signal)) = htf {
        text.push_str(&format!(
            " | HTF ({}): {} ({})",
            htf_granularity, htf_signal.signal_type, htf_signal.strength
        ));
    }
    text
}

pub fn recalc_status(symbol: &str, granularity: &str, exchange: &str) -> String {
    format!(
        "Recalculation successful for {} ({}) on {}",
        symbol, granularity, exchange
    )
}

pub fn restored_status(kind: &str, symbol: &str, granularity: &str) -> String {
    format!("Restored {} data for {} ({})", kind, symbol, granularity)
}

/// Backtest polling keeps only the ticker moving, so the text says so.
pub fn polling_started_status(symbol: &str, granularity: &str, backtest: bool) -> String {
    if backtest {
        format!("Real-time ticker updates started for {} ({}), candles frozen", symbol, granularity)
    } else {
        format!("Real-time updates started for {} ({})", symbol, granularity)
    }
}

pub const POLLING_STOPPED_STATUS: &str = "Real-time updates stopped, all pending requests canceled";

pub const RESET_STATUS: &str = "Analysis reset successfully";

pub fn error_status(message: impl std::fmt::Display) -> String {
    format!("Error: {}", message)
}
