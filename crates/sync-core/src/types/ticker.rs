//! Live ticker snapshot.

use serde::{Deserialize, Serialize};

/// Latest price plus the trailing 24 h range. Replaced wholesale on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Last traded price
    pub last_price: f64,
    /// 24 h low
    pub low_24h: f64,
    /// 24 h high
    pub high_24h: f64,
    /// Exchange timestamp (Unix milliseconds)
    pub timestamp: i64,
}

impl Ticker {
    pub fn new(last_price: f64, low_24h: f64, high_24h: f64, timestamp: i64) -> Self {
        Self {
            last_price,
            low_24h,
            high_24h,
            timestamp,
        }
    }

    /// Whether the last price lies inside the reported 24 h range (inclusive).
    pub fn is_within_range(&self) -> bool {
        self.last_price.is_finite()
            && self.low_24h <= self.last_price
            && self.last_price <= self.high_24h
    }
}
