//! Signal pipeline output types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Direction of a generated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Neutral => "NEUTRAL",
        };
        write!(f, "{}", s)
    }
}

/// Conviction of a generated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    #[default]
    None,
    VeryWeak,
    Weak,
    Moderate,
    Strong,
}

impl SignalStrength {
    /// Bucket a normalized score in `[0, 1]`.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if !s.is_finite() || s <= 0.0 => SignalStrength::None,
            s if s < 0.25 => SignalStrength::VeryWeak,
            s if s < 0.5 => SignalStrength::Weak,
            s if s < 0.75 => SignalStrength::Moderate,
            _ => SignalStrength::Strong,
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalStrength::None => "None",
            SignalStrength::VeryWeak => "Very Weak",
            SignalStrength::Weak => "Weak",
            SignalStrength::Moderate => "Moderate",
            SignalStrength::Strong => "Strong",
        };
        write!(f, "{}", s)
    }
}

/// Result of one signal pipeline run.
///
/// Only `signal_type` and `strength` take part in change detection; `details`
/// carries generator-specific indicator values for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalResult {
    pub signal_type: SignalType,
    pub strength: SignalStrength,
    #[serde(default)]
    pub details: BTreeMap<String, f64>,
}

impl SignalResult {
    pub fn new(signal_type: SignalType, strength: SignalStrength) -> Self {
        Self {
            signal_type,
            strength,
            details: BTreeMap::new(),
        }
    }

    /// Neutral result used when there is nothing to analyze.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Attach an indicator value.
    pub fn with_detail(mut self, key: impl Into<String>, value: f64) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// The `(type, strength)` pair compared for notification dedup.
    pub fn key(&self) -> (SignalType, SignalStrength) {
        (self.signal_type, self.strength)
    }
}

impl fmt::Display for SignalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.signal_type, self.strength)
    }
}

/// Which generator implementation the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalVariant {
    /// EMA trend plus RSI momentum.
    #[default]
    Standard,
    /// Market-structure breaks plus volume confirmation.
    SmartMoney,
}

impl SignalVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalVariant::Standard => "standard",
            SignalVariant::SmartMoney => "smart_money",
        }
    }
}

impl fmt::Display for SignalVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "standard" | "trend" => Ok(SignalVariant::Standard),
            "smart_money" | "smc" | "structure" => Ok(SignalVariant::SmartMoney),
            _ => Err(format!("Unknown signal variant: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_buckets() {
        assert_eq!(SignalStrength::from_score(0.0), SignalStrength::None);
        assert_eq!(SignalStrength::from_score(0.1), SignalStrength::VeryWeak);
        assert_eq!(SignalStrength::from_score(0.3), SignalStrength::Weak);
        assert_eq!(SignalStrength::from_score(0.6), SignalStrength::Moderate);
        assert_eq!(SignalStrength::from_score(0.9), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_score(f64::NAN), SignalStrength::None);
    }

    #[test]
    fn test_key_ignores_details() {
        let a = SignalResult::new(SignalType::Buy, SignalStrength::Weak).with_detail("rsi", 40.0);
        let b = SignalResult::new(SignalType::Buy, SignalStrength::Weak).with_detail("rsi", 41.0);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_string(), "BUY (Weak)");
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("smart-money".parse::<SignalVariant>().unwrap(), SignalVariant::SmartMoney);
        assert_eq!("standard".parse::<SignalVariant>().unwrap(), SignalVariant::Standard);
        assert!("magic".parse::<SignalVariant>().is_err());
    }
}
