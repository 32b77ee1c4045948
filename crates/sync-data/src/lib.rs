//! Exchange adapters and symbol cache.
//!
//! Adapters:
//! - [`BinanceExchange`]: public REST API
//! - [`CsvExchange`]: a single series loaded from a CSV file
//! - [`SimulatedExchange`]: deterministic synthetic data with scriptable failures

mod binance;
mod csv_exchange;
mod registry;
mod simulated;
mod symbols;

pub use binance::{BinanceExchange, BINANCE_BASE_URL};
pub use csv_exchange::CsvExchange;
pub use registry::ExchangeRegistry;
pub use simulated::SimulatedExchange;
pub use symbols::{BootstrapPolicy, SymbolCache, DEFAULT_SYMBOL, POPULAR_SYMBOLS};

use sync_core::error::ExchangeError;
use tokio_util::sync::CancellationToken;

/// Await `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T, ExchangeError>>,
) -> Result<T, ExchangeError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExchangeError::Cancelled),
        result = fut => result,
    }
}
