//! Per-exchange symbol cache.

use crate::ExchangeRegistry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use sync_core::error::{SyncError, SyncResult};
use tracing::{debug, info, warn};

/// Fallback when a symbol list is unavailable.
pub const DEFAULT_SYMBOL: &str = "BTC/USDT";

/// Offered while an exchange's list has not been fetched.
pub const POPULAR_SYMBOLS: &[&str] = &[
    "BTC/USDT", "ETH/USDT", "BNB/USDT", "XRP/USDT", "ADA/USDT", "SOL/USDT", "DOGE/USDT",
    "DOT/USDT", "TRX/USDT", "AVAX/USDT", "LINK/USDT", "TON/USDT", "LTC/USDT", "BCH/USDT",
    "NEAR/USDT", "XLM/USDT", "ETC/USDT", "FIL/USDT", "AAVE/USDT", "UNI/USDT", "ATOM/USDT",
    "ORDI/USDT", "INJ/USDT",
];

/// Retry policy of [`SymbolCache::bootstrap`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapPolicy {
    /// Batch attempts before giving up
    pub max_attempts: u32,
    /// Delay after the first failed batch; doubles per attempt
    pub initial_backoff: Duration,
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Symbol lists per exchange id.
#[derive(Default)]
pub struct SymbolCache {
    symbols: RwLock<HashMap<String, Vec<String>>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch symbols from every registered adapter whose list is still empty.
    ///
    /// A batch succeeds only when every adapter returns a non-empty list;
    /// otherwise the missing ones are retried after a growing backoff, up to
    /// `policy.max_attempts` batches.
    pub async fn bootstrap(
        &self,
        registry: &ExchangeRegistry,
        policy: &BootstrapPolicy,
    ) -> SyncResult<()> {
        let mut backoff = policy.initial_backoff;
        for attempt in 1..=policy.max_attempts.max(1) {
            let mut all_ok = true;
            for adapter in registry.adapters() {
                let id = adapter.id().to_lowercase();
                if self.is_cached(&id) {
                    continue;
                }
                match adapter.fetch_symbols().await {
                    Ok(list) if !list.is_empty() => {
                        debug!(exchange = %id, count = list.len(), "Symbols cached");
                        self.insert(&id, list);
                    }
                    Ok(_) => {
                        warn!(exchange = %id, attempt, "Exchange returned no symbols");
                        all_ok = false;
                    }
                    Err(e) => {
                        warn!(exchange = %id, attempt, error = %e, "Symbol fetch failed");
                        all_ok = false;
                    }
                }
            }

            if all_ok {
                info!(exchanges = registry.len(), attempt, "Symbol cache ready");
                return Ok(());
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }
        Err(SyncError::SymbolBootstrap {
            attempts: policy.max_attempts.max(1),
        })
    }

    /// Replace the list of `exchange`, sorted and deduplicated.
    pub fn insert(&self, exchange: &str, mut symbols: Vec<String>) {
        symbols.sort();
        symbols.dedup();
        self.symbols.write().insert(exchange.to_lowercase(), symbols);
    }

    pub fn is_cached(&self, exchange: &str) -> bool {
        self.symbols
            .read()
            .get(&exchange.to_lowercase())
            .is_some_and(|list| !list.is_empty())
    }

    /// Cached symbols, or [`POPULAR_SYMBOLS`] when nothing is cached. Sorted.
    pub fn symbols_for(&self, exchange: &str) -> Vec<String> {
        match self.symbols.read().get(&exchange.to_lowercase()) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => {
                let mut popular: Vec<String> = POPULAR_SYMBOLS.iter().map(|s| s.to_string()).collect();
                popular.sort();
                popular
            }
        }
    }

    /// Case-insensitive substring matches, alphabetical.
    pub fn search(&self, exchange: &str, term: &str) -> Vec<String> {
        let needle = term.trim().to_uppercase();
        self.symbols_for(exchange)
            .into_iter()
            .filter(|s| s.to_uppercase().contains(&needle))
            .collect()
    }

    /// `current` when the exchange lists it, else [`DEFAULT_SYMBOL`] when
    /// listed, else the first listed symbol.
    pub fn default_symbol(&self, exchange: &str, current: Option<&str>) -> String {
        let available = self.symbols_for(exchange);
        current
            .filter(|c| available.iter().any(|s| s.as_str() == *c))
            .or_else(|| available.iter().find(|s| *s == DEFAULT_SYMBOL).map(String::as_str))
            .or_else(|| available.first().map(String::as_str))
            .unwrap_or(DEFAULT_SYMBOL)
            .to_string()
    }

    pub fn clear(&self) {
        self.symbols.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedExchange;
    use std::sync::Arc;

    fn registry_with(exchange: Arc<SimulatedExchange>) -> ExchangeRegistry {
        let mut registry = ExchangeRegistry::new();
        registry.register(exchange);
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_retries_until_success() {
        let exchange = Arc::new(SimulatedExchange::new());
        exchange.fail_symbol_fetches(2);
        let registry = registry_with(exchange.clone());
        let cache = SymbolCache::new();

        cache.bootstrap(&registry, &BootstrapPolicy::default()).await.unwrap();
        assert_eq!(exchange.symbol_calls(), 3);
        assert!(cache.is_cached("simulated"));

        // Cached exchanges are not fetched again.
        cache.bootstrap(&registry, &BootstrapPolicy::default()).await.unwrap();
        assert_eq!(exchange.symbol_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_gives_up() {
        let exchange = Arc::new(SimulatedExchange::new());
        exchange.fail_symbol_fetches(10);
        let registry = registry_with(exchange.clone());
        let cache = SymbolCache::new();
        let policy = BootstrapPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
        };

        let err = cache.bootstrap(&registry, &policy).await.unwrap_err();
        assert!(matches!(err, SyncError::SymbolBootstrap { attempts: 3 }));
        assert_eq!(exchange.symbol_calls(), 3);
        assert!(!cache.is_cached("simulated"));
    }

    #[test]
    fn test_fallback_and_search() {
        let cache = SymbolCache::new();
        let popular = cache.symbols_for("binance");
        assert!(popular.contains(&"BTC/USDT".to_string()));
        assert!(popular.windows(2).all(|w| w[0] <= w[1]));

        cache.insert("binance", vec!["ETH/BTC".into(), "BTC/USDT".into(), "ETH/USDT".into()]);
        assert_eq!(cache.search("binance", "eth"), vec!["ETH/BTC", "ETH/USDT"]);
        assert_eq!(cache.search("binance", "usdt"), vec!["BTC/USDT", "ETH/USDT"]);
    }

    #[test]
    fn test_default_symbol() {
        let cache = SymbolCache::new();
        cache.insert("mexc", vec!["ETH/USDT".into(), "BTC/USDT".into()]);
        assert_eq!(cache.default_symbol("mexc", Some("ETH/USDT")), "ETH/USDT");
        assert_eq!(cache.default_symbol("mexc", Some("DOGE/USDT")), "BTC/USDT");

        cache.insert("bitmart", vec!["ZIL/USDT".into(), "ADA/USDT".into()]);
        assert_eq!(cache.default_symbol("bitmart", None), "ADA/USDT");
    }
}
