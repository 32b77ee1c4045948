//! Symbols command implementation.

use anyhow::Result;
use std::sync::Arc;
use sync_config::AppConfig;
use sync_core::traits::{Clock, SystemClock};
use sync_data::{ExchangeRegistry, SymbolCache};
use tracing::warn;

use super::build_registry;
use crate::cli::SymbolsArgs;

pub async fn run(args: SymbolsArgs, config: &AppConfig) -> Result<()> {
    let exchange_id = args
        .exchange
        .clone()
        .unwrap_or_else(|| config.exchange.default_id.clone());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = build_registry(&config.exchange, clock)?;

    // Only the requested adapter is bootstrapped.
    let mut selected = ExchangeRegistry::new();
    selected.register(registry.get(&exchange_id)?);

    let cache = SymbolCache::new();
    if let Err(e) = cache.bootstrap(&selected, &config.symbols.policy()).await {
        warn!(exchange = %exchange_id, error = %e, "Falling back to popular symbols");
    }

    let symbols = match &args.search {
        Some(term) => cache.search(&exchange_id, term),
        None => cache.symbols_for(&exchange_id),
    };

    println!("Symbols on {} ({} found)", exchange_id, symbols.len());
    println!("═══════════════════════════════════════════════════════════");
    for symbol in symbols.iter().take(args.max) {
        println!("  {}", symbol);
    }
    if symbols.len() > args.max {
        println!("  ... {} more", symbols.len() - args.max);
    }
    println!();
    println!(
        "Default symbol: {}",
        cache.default_symbol(&exchange_id, Some(config.fetch.symbol.as_str()))
    );

    Ok(())
}
