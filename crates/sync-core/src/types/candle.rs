//! OHLCV candle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV candle as delivered by an exchange adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Period open time, Unix milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price (last price for the in-progress candle)
    pub close: f64,
    /// Base asset volume
    pub volume: f64,
    /// Quote asset volume, when the exchange reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<f64>,
}

impl Candle {
    /// Create a new candle.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            quote_volume: None,
        }
    }

    /// Attach a quote volume.
    pub fn with_quote_volume(mut self, quote_volume: f64) -> Self {
        self.quote_volume = Some(quote_volume);
        self
    }

    /// Shape and value check: finite fields, `high >= low`, positive open and
    /// close, non-negative volume.
    pub fn is_valid(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.low
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Check if the candle is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// The candle's range (high - low).
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Ascending, deduplicated candle sequence bounded to `limit` entries.
///
/// When the bound is exceeded the oldest candles are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    limit: usize,
}

impl CandleSeries {
    /// Create an empty series. A `limit` of 0 means unbounded.
    pub fn new(limit: usize) -> Self {
        Self {
            candles: Vec::new(),
            limit,
        }
    }

    /// Build a series from candles in any order. Duplicated timestamps keep
    /// the last occurrence.
    pub fn from_candles(candles: impl IntoIterator<Item = Candle>, limit: usize) -> Self {
        let mut candles: Vec<Candle> = candles.into_iter().collect();
        // Stable sort keeps arrival order among equal timestamps.
        candles.sort_by_key(|c| c.timestamp);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }
        let mut series = Self {
            candles: deduped,
            limit,
        };
        series.enforce_limit();
        series
    }

    /// Insert a candle, replacing any candle with the same timestamp.
    pub fn push(&mut self, candle: Candle) {
        match self
            .candles
            .binary_search_by_key(&candle.timestamp, |c| c.timestamp)
        {
            Ok(idx) => self.candles[idx] = candle,
            Err(idx) => self.candles.insert(idx, candle),
        }
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.limit > 0 && self.candles.len() > self.limit {
            let excess = self.candles.len() - self.limit;
            self.candles.drain(..excess);
        }
    }

    /// Configured bound (0 = unbounded).
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// All candles, oldest first.
    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Extract close prices.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Closed candles followed by the in-progress candle, when present.
    pub fn with_in_progress(&self, in_progress: Option<&Candle>) -> Vec<Candle> {
        let mut all = self.candles.clone();
        if let Some(candle) = in_progress {
            all.push(*candle);
        }
        all
    }

    /// Oldest and newest timestamps.
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        Some((self.first()?.timestamp, self.last()?.timestamp))
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }
}
