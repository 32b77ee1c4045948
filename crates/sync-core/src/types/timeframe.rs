//! Timeframe definitions and per-exchange granularity maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Standard candle timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    #[default]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1M")]
    Monthly,
}

impl Timeframe {
    /// Get the duration of the timeframe in seconds.
    pub fn as_secs(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Minute30 => 1800,
            Timeframe::Hour1 => 3600,
            Timeframe::Hour4 => 14400,
            Timeframe::Daily => 86400,
            Timeframe::Weekly => 604800,
            Timeframe::Monthly => 2592000, // Approximate (30 days)
        }
    }

    /// Get the duration of the timeframe in milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.as_secs() * 1000
    }

    /// The coarser timeframe used for multi-timeframe confirmation.
    pub fn next_higher(&self) -> Option<Timeframe> {
        match self {
            Timeframe::Minute1 => Some(Timeframe::Minute5),
            Timeframe::Minute5 => Some(Timeframe::Minute15),
            Timeframe::Minute15 => Some(Timeframe::Hour1),
            Timeframe::Minute30 => Some(Timeframe::Hour4),
            Timeframe::Hour1 => Some(Timeframe::Hour4),
            Timeframe::Hour4 => Some(Timeframe::Daily),
            Timeframe::Daily => Some(Timeframe::Weekly),
            Timeframe::Weekly => Some(Timeframe::Monthly),
            Timeframe::Monthly => None,
        }
    }

    /// Get all available timeframes.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Minute1,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Daily,
            Timeframe::Weekly,
            Timeframe::Monthly,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) must be matched before lowercasing collides with "1m".
        if s == "1M" {
            return Ok(Timeframe::Monthly);
        }
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "minute" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "60m" | "1hour" | "hour" => Ok(Timeframe::Hour1),
            "4h" | "4hour" => Ok(Timeframe::Hour4),
            "1d" | "day" | "daily" => Ok(Timeframe::Daily),
            "1w" | "week" | "weekly" => Ok(Timeframe::Weekly),
            "month" | "monthly" => Ok(Timeframe::Monthly),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

/// Exchange-specific granularity labels: `label -> milliseconds` plus the
/// `label -> next higher label` ladder used for HTF fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularityMap {
    intervals: BTreeMap<String, i64>,
    higher: BTreeMap<String, String>,
}

impl GranularityMap {
    /// Empty map; populate with [`GranularityMap::with_interval`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Map using the standard labels of `timeframes`. A timeframe's next
    /// higher label is only recorded when that timeframe is also supported.
    pub fn from_timeframes(timeframes: &[Timeframe]) -> Self {
        let mut map = Self::new();
        for tf in timeframes {
            map.intervals.insert(tf.to_string(), tf.as_millis());
        }
        for tf in timeframes {
            if let Some(next) = tf.next_higher().filter(|n| timeframes.contains(n)) {
                map.higher.insert(tf.to_string(), next.to_string());
            }
        }
        map
    }

    /// Add or replace a label.
    pub fn with_interval(mut self, label: impl Into<String>, millis: i64) -> Self {
        self.intervals.insert(label.into(), millis);
        self
    }

    /// Add or replace a higher-timeframe link.
    pub fn with_higher(mut self, label: impl Into<String>, higher: impl Into<String>) -> Self {
        self.higher.insert(label.into(), higher.into());
        self
    }

    /// Interval length in milliseconds.
    pub fn millis(&self, label: &str) -> Option<i64> {
        self.intervals.get(label).copied()
    }

    /// Interval length in seconds.
    pub fn seconds(&self, label: &str) -> Option<i64> {
        self.millis(label).map(|ms| ms / 1000)
    }

    /// Next higher label for `label`, if the exchange defines one.
    pub fn next_higher(&self, label: &str) -> Option<&str> {
        self.higher.get(label).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.intervals.contains_key(label)
    }

    /// Labels ordered by interval length.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<(&str, i64)> = self
            .intervals
            .iter()
            .map(|(label, ms)| (label.as_str(), *ms))
            .collect();
        labels.sort_by_key(|(_, ms)| *ms);
        labels.into_iter().map(|(label, _)| label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::Minute1.as_secs(), 60);
        assert_eq!(Timeframe::Hour1.as_millis(), 3_600_000);
        assert_eq!(Timeframe::Daily.as_secs(), 86400);
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::from_str("1m").unwrap(), Timeframe::Minute1);
        assert_eq!(Timeframe::from_str("1M").unwrap(), Timeframe::Monthly);
        assert_eq!(Timeframe::from_str("60m").unwrap(), Timeframe::Hour1);
        assert!(Timeframe::from_str("7h").is_err());
    }

    #[test]
    fn test_timeframe_display_roundtrip() {
        for tf in Timeframe::all() {
            assert_eq!(Timeframe::from_str(&tf.to_string()).unwrap(), *tf);
        }
    }

    #[test]
    fn test_granularity_map_ladder() {
        let map = GranularityMap::from_timeframes(&[
            Timeframe::Minute15,
            Timeframe::Hour1,
            Timeframe::Hour4,
        ]);
        assert_eq!(map.millis("1h"), Some(3_600_000));
        assert_eq!(map.seconds("15m"), Some(900));
        assert_eq!(map.next_higher("1h"), Some("4h"));
        assert_eq!(map.next_higher("15m"), Some("1h"));
        // 1d is not supported, so 4h has no HTF.
        assert_eq!(map.next_higher("4h"), None);
        assert_eq!(map.labels(), vec!["15m", "1h", "4h"]);
    }

    #[test]
    fn test_granularity_map_custom_labels() {
        let map = GranularityMap::new()
            .with_interval("60m", 3_600_000)
            .with_interval("4h", 14_400_000)
            .with_higher("60m", "4h");
        assert!(map.contains("60m"));
        assert_eq!(map.next_higher("60m"), Some("4h"));
        assert_eq!(map.millis("1h"), None);
    }
}
