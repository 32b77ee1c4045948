//! Variant dispatch.

use crate::{StructureSignal, TrendSignal};
use sync_core::{
    traits::SignalGenerator,
    types::{Candle, SignalResult, SignalVariant},
};
use tracing::trace;

/// Holds one generator per [`SignalVariant`] and routes each call to the
/// requested one.
pub struct SignalPipeline {
    standard: Box<dyn SignalGenerator>,
    smart_money: Box<dyn SignalGenerator>,
}

impl SignalPipeline {
    pub fn new(standard: Box<dyn SignalGenerator>, smart_money: Box<dyn SignalGenerator>) -> Self {
        Self {
            standard,
            smart_money,
        }
    }

    /// Generator backing `variant`.
    pub fn generator(&self, variant: SignalVariant) -> &dyn SignalGenerator {
        match variant {
            SignalVariant::Standard => self.standard.as_ref(),
            SignalVariant::SmartMoney => self.smart_money.as_ref(),
        }
    }

    /// Run the `variant` generator over `candles`.
    pub fn generate(&self, variant: SignalVariant, candles: &[Candle]) -> SignalResult {
        let generator = self.generator(variant);
        let result = generator.generate(candles);
        trace!(
            generator = generator.name(),
            candles = candles.len(),
            signal = %result,
            "Signal generated"
        );
        result
    }
}

impl Default for SignalPipeline {
    fn default() -> Self {
        Self::new(
            Box::new(TrendSignal::default()),
            Box::new(StructureSignal::default()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_variant() {
        let pipeline = SignalPipeline::default();
        assert_eq!(pipeline.generator(SignalVariant::Standard).name(), "Trend");
        assert_eq!(pipeline.generator(SignalVariant::SmartMoney).name(), "Structure");
    }

    #[test]
    fn test_empty_input_is_neutral() {
        let pipeline = SignalPipeline::default();
        for variant in [SignalVariant::Standard, SignalVariant::SmartMoney] {
            assert_eq!(pipeline.generate(variant, &[]), SignalResult::neutral());
        }
    }
}
