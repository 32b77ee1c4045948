//! Splitting fetched windows into closed and in-progress candles.

use sync_core::types::{Candle, CandleSeries, Ticker};
use tracing::warn;

/// Output of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Closed candles, ascending, at most `limit`
    pub closed: CandleSeries,
    /// Candle of the currently open period
    pub in_progress: Option<Candle>,
    /// Invalid in-progress candles that were discarded
    pub dropped_invalid: usize,
}

impl Reconciled {
    /// Closed candles followed by the in-progress candle.
    pub fn all(&self) -> Vec<Candle> {
        self.closed.with_in_progress(self.in_progress.as_ref())
    }
}

/// Open time of the period containing `now_ms`.
pub fn current_period_start(now_ms: i64, granularity_ms: i64) -> i64 {
    if granularity_ms <= 0 {
        return now_ms;
    }
    now_ms.div_euclid(granularity_ms) * granularity_ms
}

/// Split `raw` (any order) at the start of the current period.
///
/// Candles opening before the current period are closed; the earliest one
/// opening at or after it is the in-progress candle and any later ones are
/// ignored. Invalid closed candles are kept with a warning, an invalid
/// in-progress candle is dropped.
pub fn reconcile(raw: Vec<Candle>, now_ms: i64, granularity_ms: i64, limit: usize) -> Reconciled {
    let period_start = current_period_start(now_ms, granularity_ms);
    let (closed, open): (Vec<Candle>, Vec<Candle>) =
        raw.into_iter().partition(|c| c.timestamp < period_start);

    for candle in closed.iter().filter(|c| !c.is_valid()) {
        warn!(timestamp = candle.timestamp, "Invalid closed candle");
    }

    let mut dropped_invalid = 0;
    let in_progress = match open.into_iter().min_by_key(|c| c.timestamp) {
        Some(candle) if candle.is_valid() => Some(candle),
        Some(candle) => {
            warn!(timestamp = candle.timestamp, "Dropping invalid in-progress candle");
            dropped_invalid += 1;
            None
        }
        None => None,
    };

    Reconciled {
        closed: CandleSeries::from_candles(closed, limit),
        in_progress,
        dropped_invalid,
    }
}

/// Result of [`patch_close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    /// Last price outside the 24 h range; the candle was left alone.
    OutOfRange,
    NoCandle,
    /// The in-progress candle is signal input and stays as fetched.
    SignalInput,
}

/// Move the in-progress candle's close to the ticker's last price. Only the
/// close changes.
pub fn patch_close(in_progress: &mut Option<Candle>, ticker: &Ticker) -> PatchOutcome {
    let Some(candle) = in_progress.as_mut() else {
        return PatchOutcome::NoCandle;
    };
    if !ticker.is_within_range() {
        warn!(
            last = ticker.last_price,
            low_24h = ticker.low_24h,
            high_24h = ticker.high_24h,
            "Ticker price outside 24h range, close not updated"
        );
        return PatchOutcome::OutOfRange;
    }
    candle.close = ticker.last_price;
    PatchOutcome::Patched
}
