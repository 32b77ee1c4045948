//! Deterministic synthetic exchange.
//!
//! Prices are a pure function of `(symbol, granularity, period)` so repeated
//! fetches agree with each other. Responses can be scripted ahead of time to
//! inject throttling, transport failures or hand-made candle windows, and
//! every call is counted.

use crate::cancellable;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_core::{
    error::ExchangeError,
    traits::{Clock, ExchangeAdapter, SystemClock},
    types::{Candle, GranularityMap, Symbol, Ticker, Timeframe},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Synthetic exchange for tests, demos and dry runs.
pub struct SimulatedExchange {
    id: String,
    clock: Arc<dyn Clock>,
    granularities: GranularityMap,
    base_price: f64,
    latency: Mutex<Duration>,
    symbols: Vec<String>,
    ohlcv_script: Mutex<VecDeque<Result<Vec<Candle>, ExchangeError>>>,
    ticker_script: Mutex<VecDeque<Result<Ticker, ExchangeError>>>,
    symbol_failures: AtomicUsize,
    ohlcv_calls: AtomicUsize,
    ticker_calls: AtomicUsize,
    symbol_calls: AtomicUsize,
}

impl SimulatedExchange {
    /// A `simulated` exchange on the system clock.
    pub fn new() -> Self {
        Self::with_clock("simulated", Arc::new(SystemClock))
    }

    /// An exchange reporting `id`, reading time from `clock`. Using a real
    /// exchange id makes the engine apply that exchange's profile.
    pub fn with_clock(id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id: id.into(),
            clock,
            granularities: GranularityMap::from_timeframes(Timeframe::all()),
            base_price: 100.0,
            latency: Mutex::new(Duration::ZERO),
            symbols: ["BTC/USDT", "ETH/USDT", "SOL/USDT", "XRP/USDT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ohlcv_script: Mutex::new(VecDeque::new()),
            ticker_script: Mutex::new(VecDeque::new()),
            symbol_failures: AtomicUsize::new(0),
            ohlcv_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
            symbol_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    /// Delay applied to every OHLCV and ticker call. Cancellation interrupts it.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Queue the result of a future `fetch_ohlcv` call (FIFO).
    pub fn script_ohlcv(&self, response: Result<Vec<Candle>, ExchangeError>) {
        self.ohlcv_script.lock().push_back(response);
    }

    /// Queue the result of a future `fetch_ticker` call (FIFO).
    pub fn script_ticker(&self, response: Result<Ticker, ExchangeError>) {
        self.ticker_script.lock().push_back(response);
    }

    /// Make the next `count` `fetch_symbols` calls fail.
    pub fn fail_symbol_fetches(&self, count: usize) {
        self.symbol_failures.store(count, Ordering::SeqCst);
    }

    pub fn ohlcv_calls(&self) -> usize {
        self.ohlcv_calls.load(Ordering::SeqCst)
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    pub fn symbol_calls(&self) -> usize {
        self.symbol_calls.load(Ordering::SeqCst)
    }

    /// Synthetic candle for the period opening at `timestamp`.
    pub fn candle_at(&self, symbol: &Symbol, granularity_ms: i64, timestamp: i64) -> Candle {
        let seed = symbol_seed(symbol) ^ granularity_ms as u64;
        let period = timestamp.div_euclid(granularity_ms);
        let open = self.price(seed, period - 1);
        let close = self.price(seed, period);
        let wick_up = unit(splitmix64(seed ^ (period as u64).wrapping_mul(3))) * 0.004;
        let wick_down = unit(splitmix64(seed ^ (period as u64).wrapping_mul(5))) * 0.004;
        let volume = 10.0 + 90.0 * unit(splitmix64(seed ^ (period as u64).wrapping_mul(7)));
        Candle::new(
            timestamp,
            open,
            open.max(close) * (1.0 + wick_up),
            open.min(close) * (1.0 - wick_down),
            close,
            volume,
        )
    }

    fn price(&self, seed: u64, period: i64) -> f64 {
        let cycle = (period as f64 / 24.0).sin() * 0.08;
        let noise = (unit(splitmix64(seed ^ period as u64)) - 0.5) * 0.01;
        self.base_price * (1.0 + cycle + noise)
    }

    async fn simulate_latency(&self, cancel: &CancellationToken) -> Result<(), ExchangeError> {
        let latency = *self.latency.lock();
        if latency.is_zero() {
            return if cancel.is_cancelled() {
                Err(ExchangeError::Cancelled)
            } else {
                Ok(())
            };
        }
        cancellable(cancel, async {
            tokio::time::sleep(latency).await;
            Ok(())
        })
        .await
    }
}

impl Default for SimulatedExchange {
    fn default() -> Self {
        Self::new()
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Map to `[0, 1)`.
fn unit(x: u64) -> f64 {
    (x >> 11) as f64 / (1u64 << 53) as f64
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol
        .pair()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3))
}

#[async_trait]
impl ExchangeAdapter for SimulatedExchange {
    fn id(&self) -> &str {
        &self.id
    }

    fn granularity_map(&self) -> &GranularityMap {
        &self.granularities
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        granularity: &str,
        start: i64,
        end: i64,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.ohlcv_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency(cancel).await?;

        if let Some(scripted) = self.ohlcv_script.lock().pop_front() {
            return scripted;
        }

        let step = self
            .granularities
            .millis(granularity)
            .ok_or_else(|| ExchangeError::UnsupportedGranularity(granularity.to_string()))?;
        let now = self.clock.now_ms();
        let first = start.div_euclid(step) * step + if start.rem_euclid(step) == 0 { 0 } else { step };
        // Nothing opens after `now`.
        let last_open = end.min(now + 1);

        let mut candles: Vec<Candle> = (0..)
            .map(|k| first + k * step)
            .take_while(|ts| *ts < last_open)
            .map(|ts| self.candle_at(symbol, step, ts))
            .collect();
        let excess = candles.len().saturating_sub(limit as usize);
        candles.drain(..excess);
        debug!(symbol = %symbol, granularity, count = candles.len(), "Simulated candles served");
        Ok(candles)
    }

    async fn fetch_ticker(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Ticker, ExchangeError> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency(cancel).await?;

        if let Some(scripted) = self.ticker_script.lock().pop_front() {
            return scripted;
        }

        let now = self.clock.now_ms();
        let minute = Timeframe::Minute1.as_millis();
        let live = self.candle_at(symbol, minute, now.div_euclid(minute) * minute);
        Ok(Ticker::new(
            live.close,
            self.base_price * 0.85,
            self.base_price * 1.15,
            now,
        ))
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        let pending_failures = self.symbol_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.symbol_failures.store(pending_failures - 1, Ordering::SeqCst);
            return Err(ExchangeError::Connection("simulated outage".into()));
        }
        Ok(self.symbols.clone())
    }
}
