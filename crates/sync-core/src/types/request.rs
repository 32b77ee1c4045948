//! Fetch request parameters and symbol parsing.

use crate::error::ValidationError;
use crate::types::exchange::{ExchangeProfile, HTF_LIMIT_RANGE};
use crate::types::signal::SignalVariant;
use crate::types::timeframe::GranularityMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A base/quote trading pair such as `BTC/USDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    /// Parse `BASE/QUOTE`. Both sides must be non-empty alphanumeric; the
    /// result is uppercased.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingSymbol);
        }
        let (base, quote) = raw
            .split_once('/')
            .ok_or_else(|| ValidationError::SymbolFormat(raw.to_string()))?;
        let well_formed = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !well_formed(base) || !well_formed(quote) {
            return Err(ValidationError::SymbolFormat(raw.to_string()));
        }
        Ok(Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }

    /// `BASE/QUOTE`
    pub fn pair(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// `BASEQUOTE`, the form most REST APIs expect.
    pub fn compact(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::parse(s)
    }
}

/// Parameters of one OHLCV/ticker synchronization.
///
/// Built once from user input and passed by value; the engine never mutates
/// a request after [`FetchRequest::validate`] accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Exchange adapter id
    pub exchange_id: String,
    /// Raw symbol text, `BASE/QUOTE`
    pub symbol: String,
    /// Base granularity label
    pub granularity: String,
    /// Closed candles to keep for the base series
    pub limit: u32,
    /// Closed candles to keep for the HTF series
    pub htf_limit: u32,
    /// Explicit window start (Unix ms)
    pub start_time: Option<i64>,
    /// Explicit window end (Unix ms)
    pub end_time: Option<i64>,
    /// Position size used by the presentation layer
    pub trade_size: Decimal,
    /// Fee percentage used by the presentation layer
    pub fee_percent: Decimal,
    /// Fetch and analyze the next higher timeframe
    pub with_htf: bool,
    /// Include the in-progress candle in signal input
    pub with_latest_candle: bool,
    /// Generator implementation
    pub signal_variant: SignalVariant,
}

impl FetchRequest {
    pub fn new(
        exchange_id: impl Into<String>,
        symbol: impl Into<String>,
        granularity: impl Into<String>,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            symbol: symbol.into(),
            granularity: granularity.into(),
            limit: 200,
            htf_limit: 60,
            start_time: None,
            end_time: None,
            trade_size: dec!(100),
            fee_percent: dec!(0.1),
            with_htf: false,
            with_latest_candle: false,
            signal_variant: SignalVariant::Standard,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_htf_limit(mut self, htf_limit: u32) -> Self {
        self.htf_limit = htf_limit;
        self
    }

    pub fn with_window(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_trade_size(mut self, trade_size: Decimal) -> Self {
        self.trade_size = trade_size;
        self
    }

    pub fn with_fee_percent(mut self, fee_percent: Decimal) -> Self {
        self.fee_percent = fee_percent;
        self
    }

    pub fn with_htf(mut self, enabled: bool) -> Self {
        self.with_htf = enabled;
        self
    }

    pub fn with_latest_candle(mut self, enabled: bool) -> Self {
        self.with_latest_candle = enabled;
        self
    }

    pub fn with_signal_variant(mut self, variant: SignalVariant) -> Self {
        self.signal_variant = variant;
        self
    }

    /// Parsed symbol.
    pub fn parsed_symbol(&self) -> Result<Symbol, ValidationError> {
        Symbol::parse(&self.symbol)
    }

    /// Explicit window, when both bounds are present.
    pub fn window(&self) -> Option<(i64, i64)> {
        self.start_time.zip(self.end_time)
    }

    /// Check every parameter against the exchange's profile and granularities.
    /// Returns the parsed symbol on success.
    pub fn validate(
        &self,
        profile: &ExchangeProfile,
        granularities: &GranularityMap,
    ) -> Result<Symbol, ValidationError> {
        let symbol = self.parsed_symbol()?;

        if self.granularity.trim().is_empty() {
            return Err(ValidationError::MissingGranularity);
        }
        if !granularities.contains(&self.granularity) {
            return Err(ValidationError::UnknownGranularity(self.granularity.clone()));
        }

        if !(profile.min_limit..=profile.max_limit).contains(&self.limit) {
            return Err(ValidationError::LimitOutOfRange {
                value: self.limit,
                min: profile.min_limit,
                max: profile.max_limit,
            });
        }
        let (htf_min, htf_max) = HTF_LIMIT_RANGE;
        if !(htf_min..=htf_max).contains(&self.htf_limit) {
            return Err(ValidationError::HtfLimitOutOfRange {
                value: self.htf_limit,
                min: htf_min,
                max: htf_max,
            });
        }

        if self.trade_size <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTradeSize);
        }
        if self.fee_percent < Decimal::ZERO {
            return Err(ValidationError::NegativeFee);
        }

        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start >= end => {
                Err(ValidationError::InvertedWindow { start, end })
            }
            (Some(_), None) | (None, Some(_)) => Err(ValidationError::PartialWindow),
            _ => Ok(symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    fn granularities() -> GranularityMap {
        GranularityMap::from_timeframes(&[Timeframe::Hour1, Timeframe::Hour4])
    }

    #[test]
    fn test_symbol_parse() {
        let symbol = Symbol::parse("btc/usdt").unwrap();
        assert_eq!(symbol.pair(), "BTC/USDT");
        assert_eq!(symbol.compact(), "BTCUSDT");

        assert_eq!(Symbol::parse(""), Err(ValidationError::MissingSymbol));
        assert!(matches!(Symbol::parse("BTCUSDT"), Err(ValidationError::SymbolFormat(_))));
        assert!(matches!(Symbol::parse("BTC/"), Err(ValidationError::SymbolFormat(_))));
        assert!(matches!(Symbol::parse("BTC-X/USDT"), Err(ValidationError::SymbolFormat(_))));
    }

    #[test]
    fn test_valid_request() {
        let request = FetchRequest::new("binance", "BTC/USDT", "1h");
        let profile = ExchangeProfile::for_id("binance");
        assert!(request.validate(&profile, &granularities()).is_ok());
    }

    #[test]
    fn test_limit_bounds_depend_on_profile() {
        let request = FetchRequest::new("mexc", "BTC/USDT", "1h").with_limit(800);
        let err = request
            .validate(&ExchangeProfile::for_id("mexc"), &granularities())
            .unwrap_err();
        assert_eq!(err, ValidationError::LimitOutOfRange { value: 800, min: 200, max: 500 });

        let request = request.with_limit(1500);
        let err = request
            .validate(&ExchangeProfile::for_id("binance"), &granularities())
            .unwrap_err();
        assert!(matches!(err, ValidationError::LimitOutOfRange { value: 1500, .. }));
    }

    #[test]
    fn test_other_violations() {
        let profile = ExchangeProfile::for_id("binance");
        let base = FetchRequest::new("binance", "BTC/USDT", "1h");

        let err = base.clone().with_htf_limit(0).validate(&profile, &granularities());
        assert!(matches!(err, Err(ValidationError::HtfLimitOutOfRange { .. })));

        let err = base.clone().with_trade_size(Decimal::ZERO).validate(&profile, &granularities());
        assert_eq!(err, Err(ValidationError::NonPositiveTradeSize));

        let err = base.clone().with_fee_percent(dec!(-1)).validate(&profile, &granularities());
        assert_eq!(err, Err(ValidationError::NegativeFee));

        let err = FetchRequest::new("binance", "BTC/USDT", "7m").validate(&profile, &granularities());
        assert!(matches!(err, Err(ValidationError::UnknownGranularity(_))));

        let err = base
            .clone()
            .with_window(Some(10), Some(5))
            .validate(&profile, &granularities());
        assert!(matches!(err, Err(ValidationError::InvertedWindow { .. })));

        let err = base.with_window(Some(10), None).validate(&profile, &granularities());
        assert_eq!(err, Err(ValidationError::PartialWindow));
    }
}
