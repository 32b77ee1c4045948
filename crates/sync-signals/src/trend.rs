//! Trend generator.
//!
//! Classifies the latest candle by the fast/slow EMA spread and confirms the
//! direction with RSI: a bullish spread is a buy unless RSI is overbought, a
//! bearish spread is a sell unless RSI is oversold.

use crate::indicators::{Ema, Indicator, Rsi};
use serde::{Deserialize, Serialize};
use sync_core::{
    error::SignalError,
    traits::SignalGenerator,
    types::{Candle, SignalResult, SignalStrength, SignalType},
};

/// Configuration for the trend generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Fast EMA period
    pub fast_period: usize,
    /// Slow EMA period
    pub slow_period: usize,
    /// RSI period
    pub rsi_period: usize,
    /// No buys above this RSI
    pub overbought: f64,
    /// No sells below this RSI
    pub oversold: f64,
    /// EMA spread (percent of the slow EMA) that counts as full strength
    pub full_spread_percent: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            fast_period: 9,
            slow_period: 21,
            rsi_period: 14,
            overbought: 70.0,
            oversold: 30.0,
            full_spread_percent: 1.0,
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.fast_period == 0 || self.fast_period >= self.slow_period {
            return Err(SignalError::InvalidConfig(
                "Fast period must be positive and below the slow period".into(),
            ));
        }
        if self.rsi_period < 2 {
            return Err(SignalError::InvalidConfig("RSI period must be at least 2".into()));
        }
        if !(0.0..=100.0).contains(&self.oversold)
            || !(0.0..=100.0).contains(&self.overbought)
            || self.overbought <= self.oversold
        {
            return Err(SignalError::InvalidConfig(
                "RSI thresholds must satisfy 0 <= oversold < overbought <= 100".into(),
            ));
        }
        if self.full_spread_percent <= 0.0 {
            return Err(SignalError::InvalidConfig("Full spread must be positive".into()));
        }
        Ok(())
    }
}

/// EMA/RSI trend generator.
pub struct TrendSignal {
    config: TrendConfig,
    fast: Ema,
    slow: Ema,
    rsi: Rsi,
}

impl TrendSignal {
    pub fn new(config: TrendConfig) -> Self {
        Self {
            fast: Ema::new(config.fast_period),
            slow: Ema::new(config.slow_period),
            rsi: Rsi::new(config.rsi_period),
            config,
        }
    }

    fn score(&self, spread_percent: f64, momentum: f64) -> f64 {
        let spread = (spread_percent.abs() / self.config.full_spread_percent).min(1.0);
        0.5 * spread + 0.5 * momentum.clamp(0.0, 1.0)
    }
}

impl Default for TrendSignal {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

impl SignalGenerator for TrendSignal {
    fn name(&self) -> &str {
        "Trend"
    }

    fn generate(&self, candles: &[Candle]) -> SignalResult {
        if !self.is_warmed_up(candles.len()) {
            return SignalResult::neutral();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let (Some(fast), Some(slow), Some(rsi)) = (
            self.fast.latest(&closes),
            self.slow.latest(&closes),
            self.rsi.latest(&closes),
        ) else {
            return SignalResult::neutral();
        };
        if slow == 0.0 {
            return SignalResult::neutral();
        }

        let spread_percent = (fast - slow) / slow * 100.0;
        let (signal_type, strength) = if spread_percent > 0.0 && rsi < self.config.overbought {
            let momentum = (rsi - 50.0) / 50.0;
            (SignalType::Buy, SignalStrength::from_score(self.score(spread_percent, momentum)))
        } else if spread_percent < 0.0 && rsi > self.config.oversold {
            let momentum = (50.0 - rsi) / 50.0;
            (SignalType::Sell, SignalStrength::from_score(self.score(spread_percent, momentum)))
        } else {
            (SignalType::Neutral, SignalStrength::None)
        };

        SignalResult::new(signal_type, strength)
            .with_detail("ema_fast", fast)
            .with_detail("ema_slow", slow)
            .with_detail("rsi", rsi)
            .with_detail("spread_percent", spread_percent)
    }

    fn warmup_period(&self) -> usize {
        self.slow.period().max(self.rsi.period())
    }

    fn description(&self) -> &str {
        "EMA crossover trend with RSI momentum confirmation"
    }
}
