//! Exchange adapter trait definitions.

use crate::error::ExchangeError;
use crate::types::{Candle, GranularityMap, Symbol, Ticker};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A market data backend.
///
/// Adapters must observe `cancel` at every await point and return
/// [`ExchangeError::Cancelled`] once it fires.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Lowercase identifier used for profile and registry lookups.
    fn id(&self) -> &str;

    /// Supported granularity labels and their HTF ladder.
    fn granularity_map(&self) -> &GranularityMap;

    /// Next higher granularity for `label`.
    fn next_higher_timeframe(&self, label: &str) -> Option<String> {
        self.granularity_map().next_higher(label).map(str::to_string)
    }

    /// Length of `label` in seconds.
    fn granularity_to_seconds(&self, label: &str) -> Option<i64> {
        self.granularity_map().seconds(label)
    }

    /// Fetch candles with open time in `[start, end)`, oldest first.
    ///
    /// # Arguments
    /// * `symbol` - Trading pair
    /// * `granularity` - Label from [`ExchangeAdapter::granularity_map`]
    /// * `start` / `end` - Window in Unix milliseconds
    /// * `limit` - Maximum number of candles the caller needs
    /// * `cancel` - Admission token of the calling cycle
    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        granularity: &str,
        start: i64,
        end: i64,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candle>, ExchangeError>;

    /// Fetch the latest ticker.
    async fn fetch_ticker(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Ticker, ExchangeError>;

    /// List tradable symbols as `BASE/QUOTE`.
    async fn fetch_symbols(&self) -> Result<Vec<String>, ExchangeError>;
}
