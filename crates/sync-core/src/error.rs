//! Error types for the synchronization engine.

use std::time::Duration;
use thiserror::Error;

/// Top-level synchronization error.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Rate limited by provider: retry after {} seconds", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unsupported exchange: {0}")]
    AdapterUnavailable(String),

    #[error("Network error: {0}")]
    Transient(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Symbol cache bootstrap failed after {attempts} attempts")]
    SymbolBootstrap { attempts: u32 },

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl SyncError {
    /// Routine skips never surface to the user.
    pub fn is_routine_skip(&self) -> bool {
        matches!(self, SyncError::RateLimited { .. } | SyncError::Cancelled)
    }
}

impl From<ExchangeError> for SyncError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::RateLimited { retry_after_secs } => SyncError::RateLimited {
                retry_after: Duration::from_secs(retry_after_secs),
            },
            ExchangeError::Cancelled => SyncError::Cancelled,
            ExchangeError::UnsupportedExchange(id) => SyncError::AdapterUnavailable(id),
            other => SyncError::Transient(other.to_string()),
        }
    }
}

/// Request parameter violations. Fatal to the cycle and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Symbol is required")]
    MissingSymbol,

    #[error("Invalid Symbol! (e.g., Correct format is BTC/USDT): {0}")]
    SymbolFormat(String),

    #[error("Granularity is required")]
    MissingGranularity,

    #[error("Invalid granularity: {0}")]
    UnknownGranularity(String),

    #[error("Limit must be between {min} and {max}, got {value}")]
    LimitOutOfRange { value: u32, min: u32, max: u32 },

    #[error("HTF Limit must be between {min} and {max}, got {value}")]
    HtfLimitOutOfRange { value: u32, min: u32, max: u32 },

    #[error("Trade size must be positive")]
    NonPositiveTradeSize,

    #[error("Fee percentage cannot be negative")]
    NegativeFee,

    #[error("Start time must be before end time")]
    InvertedWindow { start: i64, end: i64 },

    #[error("Start and end time must be supplied together")]
    PartialWindow,

    #[error("{0}")]
    NotAllowed(String),
}

/// Exchange adapter errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Rate limited (429): retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request aborted")]
    Cancelled,

    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),

    #[error("Unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,
}

/// Snapshot store errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("No initial data available")]
    NoInitialData,

    #[error("No recent recalculation data available")]
    NoRecentData,

    #[error("Current exchange ({current}) differs from initial exchange ({stored}); data is out of stored bounds")]
    ExchangeMismatch { current: String, stored: String },

    #[error("Current symbol ({current}) differs from initial symbol ({stored}); data is out of stored bounds")]
    SymbolMismatch { current: String, stored: String },

    #[error("No candles available for the specified time range and limit")]
    EmptyWindow,
}

/// Signal generation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("Insufficient data: need {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Signal generator not found: {0}")]
    NotFound(String),

    #[error("Invalid generator configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_error_classification() {
        let err: SyncError = ExchangeError::RateLimited { retry_after_secs: 60 }.into();
        assert!(matches!(err, SyncError::RateLimited { retry_after } if retry_after.as_secs() == 60));
        assert!(err.is_routine_skip());

        let err: SyncError = ExchangeError::Cancelled.into();
        assert!(err.is_routine_skip());

        let err: SyncError = ExchangeError::Connection("reset by peer".into()).into();
        assert!(matches!(err, SyncError::Transient(_)));
        assert!(!err.is_routine_skip());
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::LimitOutOfRange { value: 1500, min: 200, max: 1000 };
        assert_eq!(err.to_string(), "Limit must be between 200 and 1000, got 1500");
    }
}
