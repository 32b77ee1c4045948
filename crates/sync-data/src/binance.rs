//! Binance public REST adapter.

use crate::cancellable;
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use sync_core::{
    error::ExchangeError,
    traits::ExchangeAdapter,
    types::{Candle, GranularityMap, Symbol, Ticker, Timeframe},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Production REST endpoint.
pub const BINANCE_BASE_URL: &str = "https://api.binance.com";

/// Largest page `/api/v3/klines` serves.
const MAX_KLINES: u32 = 1000;
/// Backoff assumed when a throttling response carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    low_price: String,
    high_price: String,
    close_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
}

/// Binance spot market data over the public REST API. No credentials needed.
pub struct BinanceExchange {
    client: Client,
    base_url: String,
    granularities: GranularityMap,
}

impl BinanceExchange {
    /// Create a client against `base_url` (see [`BINANCE_BASE_URL`]).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExchangeError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            granularities: GranularityMap::from_timeframes(Timeframe::all()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ExchangeError::Connection(e.to_string()))?;

        let resp = Self::check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| ExchangeError::Parse(e.to_string()))
    }

    /// 429 and 418 are throttling; other failures surface as HTTP errors.
    async fn check_status(resp: Response) -> Result<Response, ExchangeError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            let retry_after_secs = resp
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!(status = status.as_u16(), retry_after_secs, "Binance throttled the request");
            return Err(ExchangeError::RateLimited { retry_after_secs });
        }
        let message = resp.text().await.unwrap_or_default();
        Err(ExchangeError::Http {
            status: status.as_u16(),
            message,
        })
    }

    fn parse_f64(value: &serde_json::Value) -> Result<f64, ExchangeError> {
        if let Some(s) = value.as_str() {
            s.parse::<f64>()
                .map_err(|_| ExchangeError::Parse(format!("failed to parse '{}' as f64", s)))
        } else {
            value
                .as_f64()
                .ok_or_else(|| ExchangeError::Parse(format!("expected number, got: {}", value)))
        }
    }

    /// Kline arrays: `[openTime, open, high, low, close, volume, closeTime, quoteVolume, ...]`.
    fn parse_klines(raw: &[Vec<serde_json::Value>]) -> Result<Vec<Candle>, ExchangeError> {
        let mut candles = Vec::with_capacity(raw.len());
        for entry in raw {
            if entry.len() < 8 {
                warn!(len = entry.len(), "Skipping malformed kline entry");
                continue;
            }
            let open_time = entry[0]
                .as_i64()
                .ok_or_else(|| ExchangeError::Parse("kline open time is not an integer".into()))?;
            let candle = Candle::new(
                open_time,
                Self::parse_f64(&entry[1])?,
                Self::parse_f64(&entry[2])?,
                Self::parse_f64(&entry[3])?,
                Self::parse_f64(&entry[4])?,
                Self::parse_f64(&entry[5])?,
            )
            .with_quote_volume(Self::parse_f64(&entry[7])?);
            candles.push(candle);
        }
        Ok(candles)
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceExchange {
    fn id(&self) -> &str {
        "binance"
    }

    fn granularity_map(&self) -> &GranularityMap {
        &self.granularities
    }

    #[instrument(skip(self, symbol, cancel), fields(symbol = %symbol))]
    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        granularity: &str,
        start: i64,
        end: i64,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Candle>, ExchangeError> {
        if !self.granularities.contains(granularity) {
            return Err(ExchangeError::UnsupportedGranularity(granularity.to_string()));
        }
        // endTime is inclusive on Binance; the adapter contract is half-open.
        let query = [
            ("symbol", symbol.compact()),
            ("interval", granularity.to_string()),
            ("startTime", start.to_string()),
            ("endTime", (end - 1).to_string()),
            ("limit", limit.clamp(1, MAX_KLINES).to_string()),
        ];
        let raw: Vec<Vec<serde_json::Value>> =
            cancellable(cancel, self.get_json("/api/v3/klines", &query)).await?;
        let candles = Self::parse_klines(&raw)?;
        debug!(granularity, count = candles.len(), "Klines fetched");
        Ok(candles)
    }

    async fn fetch_ticker(
        &self,
        symbol: &Symbol,
        cancel: &CancellationToken,
    ) -> Result<Ticker, ExchangeError> {
        let query = [("symbol", symbol.compact())];
        let raw: Ticker24h =
            cancellable(cancel, self.get_json("/api/v3/ticker/24hr", &query)).await?;
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| ExchangeError::Parse(format!("failed to parse '{}' as f64", s)))
        };
        Ok(Ticker::new(
            parse(&raw.last_price)?,
            parse(&raw.low_price)?,
            parse(&raw.high_price)?,
            raw.close_time,
        ))
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        let info: ExchangeInfo = self.get_json("/api/v3/exchangeInfo", &[]).await?;
        let symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| format!("{}/{}", s.base_asset, s.quote_asset))
            .collect();
        debug!(count = symbols.len(), "Binance symbols fetched");
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_klines() {
        let raw = vec![
            vec![
                json!(1_700_000_000_000_i64),
                json!("100.0"),
                json!("110.0"),
                json!("95.0"),
                json!("105.5"),
                json!("12.5"),
                json!(1_700_003_599_999_i64),
                json!("1300.0"),
                json!(42),
                json!("6.0"),
                json!("600.0"),
                json!("0"),
            ],
            vec![json!(1), json!("1.0")],
        ];
        let candles = BinanceExchange::parse_klines(&raw).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 105.5);
        assert_eq!(candles[0].quote_volume, Some(1300.0));
    }

    #[test]
    fn test_parse_f64_rejects_garbage() {
        assert!(BinanceExchange::parse_f64(&json!("abc")).is_err());
        assert_eq!(BinanceExchange::parse_f64(&json!(2.5)).unwrap(), 2.5);
    }

    #[test]
    fn test_granularities() {
        let exchange = BinanceExchange::new(BINANCE_BASE_URL, Duration::from_secs(5)).unwrap();
        assert_eq!(exchange.next_higher_timeframe("1h").as_deref(), Some("4h"));
        assert_eq!(exchange.granularity_to_seconds("15m"), Some(900));
    }

    #[tokio::test]
    async fn test_unsupported_granularity_fails_without_io() {
        let exchange = BinanceExchange::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let symbol = Symbol::parse("BTC/USDT").unwrap();
        let result = exchange
            .fetch_ohlcv(&symbol, "7m", 0, 1, 10, &CancellationToken::new())
            .await;
        assert_eq!(result, Err(ExchangeError::UnsupportedGranularity("7m".into())));
    }
}
