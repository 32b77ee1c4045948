//! Exchange profiles: throughput tier, admission depth and request caps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Throughput tier of an exchange's public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeTier {
    /// Generous public limits.
    High,
    Standard,
}

/// Operation classes with independent rate budgets and admission counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Ohlcv,
    Ticker,
}

impl OperationClass {
    pub fn all() -> [OperationClass; 2] {
        [OperationClass::Ohlcv, OperationClass::Ticker]
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationClass::Ohlcv => f.write_str("ohlcv"),
            OperationClass::Ticker => f.write_str("ticker"),
        }
    }
}

/// Account plan. Caps the per-second limit on top of the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiPlan {
    Basic,
    Pro,
    Retailer,
    Premium,
    Partner,
    #[default]
    Enterprise,
}

impl ApiPlan {
    /// Calls per second allowed by the plan on an exchange of `tier`.
    pub fn cap(&self, tier: ExchangeTier) -> u32 {
        match self {
            ApiPlan::Basic => 1,
            ApiPlan::Pro => 2,
            ApiPlan::Retailer => 3,
            ApiPlan::Premium | ApiPlan::Partner => 5,
            ApiPlan::Enterprise => match tier {
                ExchangeTier::High => 20,
                ExchangeTier::Standard => 5,
            },
        }
    }
}

impl FromStr for ApiPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(ApiPlan::Basic),
            "pro" => Ok(ApiPlan::Pro),
            "retailer" => Ok(ApiPlan::Retailer),
            "premium" => Ok(ApiPlan::Premium),
            "partner" => Ok(ApiPlan::Partner),
            "enterprise" => Ok(ApiPlan::Enterprise),
            _ => Err(format!("Unknown API plan: {}", s)),
        }
    }
}

/// Per-exchange behaviour knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeProfile {
    /// Exchange identifier (lowercase)
    pub id: String,
    /// Throughput tier
    pub tier: ExchangeTier,
    /// Overlapping calls tolerated before the in-flight call is cancelled
    pub max_pending: u32,
    /// Smallest accepted candle limit
    pub min_limit: u32,
    /// Largest accepted candle limit
    pub max_limit: u32,
    /// Multiplier applied to the OHLCV polling interval
    pub poll_multiplier: f64,
    /// OHLCV polling interval floor in milliseconds
    pub poll_floor_ms: u64,
}

const HIGH_TIER_LIMIT: u32 = 20;
const STANDARD_LIMIT: u32 = 5;
const STANDARD_HTF_LIMIT: u32 = 4;
const DEFAULT_POLL_FLOOR_MS: u64 = 100;

/// Accepted range of the HTF candle limit, for every exchange.
pub const HTF_LIMIT_RANGE: (u32, u32) = (1, 1000);

impl ExchangeProfile {
    /// Built-in profile for `id`. Unknown ids get the standard profile.
    pub fn for_id(id: &str) -> Self {
        let id = id.to_lowercase();
        match id.as_str() {
            "binance" | "bitget" => Self {
                tier: ExchangeTier::High,
                ..Self::standard(id)
            },
            "mexc" => Self {
                max_pending: 2,
                max_limit: 500,
                poll_multiplier: 1.5,
                poll_floor_ms: 150,
                ..Self::standard(id)
            },
            _ => Self::standard(id),
        }
    }

    fn standard(id: String) -> Self {
        Self {
            id,
            tier: ExchangeTier::Standard,
            max_pending: 3,
            min_limit: 200,
            max_limit: 1000,
            poll_multiplier: 1.0,
            poll_floor_ms: DEFAULT_POLL_FLOOR_MS,
        }
    }

    /// Tier-table limit per second. Ticker limits ignore the HTF toggle.
    pub fn tier_limit(&self, op: OperationClass, with_htf: bool) -> u32 {
        match (self.tier, op, with_htf) {
            (ExchangeTier::High, _, _) => HIGH_TIER_LIMIT,
            (ExchangeTier::Standard, OperationClass::Ohlcv, true) => STANDARD_HTF_LIMIT,
            (ExchangeTier::Standard, _, _) => STANDARD_LIMIT,
        }
    }

    /// Effective per-second limit: `min(tier table, plan cap)`.
    pub fn rate_limit(&self, op: OperationClass, with_htf: bool, plan: ApiPlan) -> u32 {
        self.tier_limit(op, with_htf).min(plan.cap(self.tier))
    }

    /// OHLCV polling interval for `per_second` admitted calls, scaled by the
    /// profile's multiplier and floor.
    pub fn poll_interval(&self, per_second: u32) -> Duration {
        let base = 1000.0 / f64::from(per_second.max(1)) * self.poll_multiplier;
        let ms = (base as u64).max(self.poll_floor_ms);
        Duration::from_millis(ms)
    }

    /// Ticker polling interval: `max(1000 / per_second, 100 ms)` on every
    /// exchange.
    pub fn ticker_poll_interval(&self, per_second: u32) -> Duration {
        let ms = (1000 / u64::from(per_second.max(1))).max(DEFAULT_POLL_FLOOR_MS);
        Duration::from_millis(ms)
    }
}
