//! Signal generator trait definitions.

use crate::types::{Candle, SignalResult};

/// A pure signal generator.
///
/// Implementations hold configuration only; `generate` must not depend on
/// previous calls so that snapshots can be re-analyzed offline.
pub trait SignalGenerator: Send + Sync {
    /// Get the unique name of this generator.
    fn name(&self) -> &str;

    /// Analyze `candles` (oldest first) and classify the latest one.
    ///
    /// Returns a neutral result when fewer than
    /// [`SignalGenerator::warmup_period`] candles are supplied.
    fn generate(&self, candles: &[Candle]) -> SignalResult;

    /// Number of candles needed before a non-neutral result is possible.
    fn warmup_period(&self) -> usize;

    /// Check if enough candles are available.
    fn is_warmed_up(&self, candles_available: usize) -> bool {
        candles_available >= self.warmup_period()
    }

    /// Get a description of the generator.
    fn description(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalStrength, SignalType};

    struct LastMove;

    impl SignalGenerator for LastMove {
        fn name(&self) -> &str {
            "last_move"
        }

        fn generate(&self, candles: &[Candle]) -> SignalResult {
            match candles.last() {
                Some(c) if self.is_warmed_up(candles.len()) && c.is_bullish() => {
                    SignalResult::new(SignalType::Buy, SignalStrength::Weak)
                }
                _ => SignalResult::neutral(),
            }
        }

        fn warmup_period(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_generator_warmup() {
        let generator = LastMove;
        let up = Candle::new(0, 1.0, 2.0, 1.0, 2.0, 1.0);
        assert_eq!(generator.generate(&[up]).signal_type, SignalType::Neutral);
        assert_eq!(generator.generate(&[up, up]).signal_type, SignalType::Buy);
        assert!(!generator.is_warmed_up(1));
    }
}
