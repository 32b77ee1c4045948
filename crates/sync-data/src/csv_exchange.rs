//! CSV-backed adapter for offline runs.

use crate::cancellable;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use sync_core::{
    error::ExchangeError,
    traits::ExchangeAdapter,
    types::{Candle, GranularityMap, Symbol, Ticker, Timeframe},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DAY_MS: i64 = 86_400_000;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Serves one symbol's candles from a CSV file.
///
/// The file holds the base granularity; every higher timeframe on the ladder
/// is served by resampling, so HTF analysis works offline too.
pub struct CsvExchange {
    symbol: Symbol,
    base: Timeframe,
    candles: Vec<Candle>,
    granularities: GranularityMap,
}

impl CsvExchange {
    /// Load `path`, whose rows are `base` candles for `symbol`.
    pub fn open(path: impl AsRef<Path>, symbol: Symbol, base: Timeframe) -> Result<Self, ExchangeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ExchangeError::NoDataAvailable);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ExchangeError::Parse(e.to_string()))?;

        let mut candles = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| ExchangeError::Parse(e.to_string()))?;
            let timestamp = parse_timestamp(&record.date)?;
            candles.push(Candle::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }
        info!(path = %path.display(), rows = candles.len(), "CSV series loaded");
        Ok(Self::from_candles(symbol, base, candles))
    }

    /// Build from in-memory candles.
    pub fn from_candles(symbol: Symbol, base: Timeframe, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);

        let mut ladder = vec![base];
        while let Some(next) = ladder.last().and_then(|tf| tf.next_higher()) {
            ladder.push(next);
        }

        Self {
            symbol,
            base,
            candles,
            granularities: GranularityMap::from_timeframes(&ladder),
        }
    }

    fn check_symbol(&self, symbol: &Symbol) -> Result<(), ExchangeError> {
        if *symbol == self.symbol {
            Ok(())
        } else {
            Err(ExchangeError::SymbolNotFound(symbol.pair()))
        }
    }

    /// Candles of `granularity`, resampled from the base series when coarser.
    fn series(&self, granularity: &str) -> Result<Vec<Candle>, ExchangeError> {
        let bucket = self
            .granularities
            .millis(granularity)
            .ok_or_else(|| ExchangeError::UnsupportedGranularity(granularity.to_string()))?;
        if bucket == self.base.as_millis() {
            return Ok(self.candles.clone());
        }
        Ok(resample(&self.candles, bucket))
    }
}

/// Aggregate ascending candles into `bucket_ms` periods aligned to the epoch.
fn resample(candles: &[Candle], bucket_ms: i64) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::new();
    for c in candles {
        let start = c.timestamp.div_euclid(bucket_ms) * bucket_ms;
        match out.last_mut() {
            Some(agg) if agg.timestamp == start => {
                agg.high = agg.high.max(c.high);
                agg.low = agg.low.min(c.low);
                agg.close = c.close;
                agg.volume += c.volume;
            }
            _ => out.push(Candle::new(start, c.open, c.high, c.low, c.close, c.volume)),
        }
    }
    out
}

/// Parse the date formats CSV exports commonly use, or Unix seconds/millis.
fn parse_timestamp(date_str: &str) -> Result<i64, ExchangeError> {
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Some(dt) = NaiveDate::parse_from_str(date_str, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = date_str.parse::<i64>() {
        // More than 10 digits means milliseconds.
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(ExchangeError::Parse(format!("Could not parse date: {}", date_str)))
}

#[async_trait]
impl ExchangeAdapter for CsvExchange {
    fn id(&self) -> &str {
        "csv"
    }

    fn granularity_map(&self) -> &GranularityMap {
        &self.granularities
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        granularity: &str,
        start: i64,
        end: i64,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candle>, ExchangeError> {
        cancellable(cancel, async {
            self.check_symbol(symbol)?;
            let series = self.series(granularity)?;
            let in_window: Vec<Candle> = series
                .into_iter()
                .filter(|c| c.timestamp >= start && c.timestamp < end)
                .collect();
            let skip = in_window.len().saturating_sub(limit as usize);
            debug!(granularity, available = in_window.len(), "CSV window served");
            Ok(in_window.into_iter().skip(skip).collect())
        })
        .await
    }

    async fn fetch_ticker(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Ticker, ExchangeError> {
        cancellable(cancel, async {
            self.check_symbol(symbol)?;
            let last = self.candles.last().ok_or(ExchangeError::NoDataAvailable)?;
            let day = self
                .candles
                .iter()
                .filter(|c| c.timestamp > last.timestamp - DAY_MS);
            let (low, high) = day.fold((f64::MAX, f64::MIN), |(lo, hi), c| {
                (lo.min(c.low), hi.max(c.high))
            });
            Ok(Ticker::new(last.close, low, high, last.timestamp))
        })
        .await
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        Ok(vec![self.symbol.pair()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HOUR: i64 = 3_600_000;

    fn hourly(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle::new(i * HOUR, p, p + 2.0, p - 1.0, p + 1.0, 1.0)
            })
            .collect()
    }

    fn btc() -> Symbol {
        Symbol::parse("BTC/USDT").unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970-01-01").unwrap(), 0);
        assert_eq!(parse_timestamp("1970-01-01 01:00:00").unwrap(), HOUR);
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000);
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_resample_to_four_hours() {
        let four_hours = resample(&hourly(8), 4 * HOUR);
        assert_eq!(four_hours.len(), 2);
        assert_eq!(four_hours[0].open, 100.0);
        assert_eq!(four_hours[0].close, 104.0);
        assert_eq!(four_hours[0].high, 105.0);
        assert_eq!(four_hours[0].low, 99.0);
        assert_eq!(four_hours[1].volume, 4.0);
    }

    #[tokio::test]
    async fn test_fetch_window_keeps_tail() {
        let exchange = CsvExchange::from_candles(btc(), Timeframe::Hour1, hourly(48));
        let candles = exchange
            .fetch_ohlcv(&btc(), "1h", 10 * HOUR, 30 * HOUR, 5, &CancellationToken::new())
            .await
            .unwrap();
        let stamps: Vec<i64> = candles.iter().map(|c| c.timestamp / HOUR).collect();
        assert_eq!(stamps, vec![25, 26, 27, 28, 29]);

        assert_eq!(exchange.next_higher_timeframe("1h").as_deref(), Some("4h"));
        let htf = exchange
            .fetch_ohlcv(&btc(), "4h", 0, 48 * HOUR, 100, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(htf.len(), 12);
    }

    #[tokio::test]
    async fn test_ticker_and_unknown_symbol() {
        let exchange = CsvExchange::from_candles(btc(), Timeframe::Hour1, hourly(48));
        let ticker = exchange.fetch_ticker(&btc(), &CancellationToken::new()).await.unwrap();
        assert_eq!(ticker.last_price, 148.0);
        assert_eq!(ticker.high_24h, 149.0);
        assert_eq!(ticker.low_24h, 123.0);

        let eth = Symbol::parse("ETH/USDT").unwrap();
        let err = exchange.fetch_ticker(&eth, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, ExchangeError::SymbolNotFound("ETH/USDT".into()));
    }

    #[tokio::test]
    async fn test_open_file() {
        let path = std::env::temp_dir().join(format!("candle-sync-csv-{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
        writeln!(file, "0,1.0,2.0,0.5,1.5,10").unwrap();
        writeln!(file, "3600,1.5,2.5,1.0,2.0,12").unwrap();
        drop(file);

        let exchange = CsvExchange::open(&path, btc(), Timeframe::Hour1).unwrap();
        let symbols = exchange.fetch_symbols().await.unwrap();
        assert_eq!(symbols, vec!["BTC/USDT".to_string()]);
        let candles = exchange
            .fetch_ohlcv(&btc(), "1h", 0, 2 * HOUR, 10, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(candles.len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
