//! Market-structure generator.
//!
//! A close beyond the highest high (lowest low) of the lookback window is a
//! break of structure. Strength blends how far price broke out, relative to
//! the window's range, with the breakout candle's volume against the window
//! average.

use serde::{Deserialize, Serialize};
use sync_core::{
    error::SignalError,
    traits::SignalGenerator,
    types::{Candle, SignalResult, SignalStrength, SignalType},
};

/// Configuration for the structure generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Candles before the latest one that define the swing range
    pub lookback: usize,
    /// Breakout distance, as a fraction of the swing range, that counts as full strength
    pub full_break_ratio: f64,
    /// Volume multiple of the window average that counts as full strength
    pub full_volume_ratio: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            full_break_ratio: 0.25,
            full_volume_ratio: 2.0,
        }
    }
}

impl StructureConfig {
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.lookback < 2 {
            return Err(SignalError::InvalidConfig("Lookback must be at least 2".into()));
        }
        if self.full_break_ratio <= 0.0 || self.full_volume_ratio <= 0.0 {
            return Err(SignalError::InvalidConfig(
                "Strength ratios must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Swing-break generator with volume confirmation.
pub struct StructureSignal {
    config: StructureConfig,
}

impl StructureSignal {
    pub fn new(config: StructureConfig) -> Self {
        Self { config }
    }
}

impl Default for StructureSignal {
    fn default() -> Self {
        Self::new(StructureConfig::default())
    }
}

impl SignalGenerator for StructureSignal {
    fn name(&self) -> &str {
        "Structure"
    }

    fn generate(&self, candles: &[Candle]) -> SignalResult {
        if !self.is_warmed_up(candles.len()) {
            return SignalResult::neutral();
        }

        let Some((last, history)) = candles.split_last() else {
            return SignalResult::neutral();
        };
        let window = &history[history.len() - self.config.lookback..];

        let swing_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let swing_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let range = swing_high - swing_low;
        let avg_volume = window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64;
        let volume_ratio = if avg_volume > 0.0 { last.volume / avg_volume } else { 0.0 };

        let (signal_type, distance) = if last.close > swing_high {
            (SignalType::Buy, last.close - swing_high)
        } else if last.close < swing_low {
            (SignalType::Sell, swing_low - last.close)
        } else {
            (SignalType::Neutral, 0.0)
        };

        let strength = if signal_type == SignalType::Neutral {
            SignalStrength::None
        } else {
            let break_score = if range > 0.0 {
                (distance / range / self.config.full_break_ratio).min(1.0)
            } else {
                1.0
            };
            let volume_score = (volume_ratio / self.config.full_volume_ratio).min(1.0);
            SignalStrength::from_score(0.5 * break_score + 0.5 * volume_score)
        };

        SignalResult::new(signal_type, strength)
            .with_detail("swing_high", swing_high)
            .with_detail("swing_low", swing_low)
            .with_detail("volume_ratio", volume_ratio)
    }

    fn warmup_period(&self) -> usize {
        self.config.lookback + 1
    }

    fn description(&self) -> &str {
        "Swing-range breaks of structure with volume confirmation"
    }
}
