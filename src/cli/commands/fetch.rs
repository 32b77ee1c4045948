//! Fetch command implementation.

use anyhow::{bail, Result};
use std::sync::Arc;
use sync_config::AppConfig;
use sync_engine::{CycleOutcome, FetchResult, TierState};
use sync_monitor::ConsolePresenter;
use tracing::info;

use super::{build_engine, build_request, parse_window};
use crate::cli::FetchArgs;

pub async fn run(args: FetchArgs, config: &AppConfig) -> Result<()> {
    let (start, end) = parse_window(args.start.as_deref(), args.end.as_deref())?;
    let request = build_request(&args.source, config).with_window(start, end);
    let engine = build_engine(&args.source, config, Arc::new(ConsolePresenter::new()))?;

    info!(
        exchange = %request.exchange_id,
        symbol = %request.symbol,
        granularity = %request.granularity,
        htf = request.with_htf,
        "Fetching candles"
    );

    let result = match engine.run_ohlcv_cycle(&request, false).await? {
        CycleOutcome::Completed(result) => result,
        CycleOutcome::Skipped(reason) => bail!("Fetch skipped: {:?}", reason),
    };
    print_summary(&result);

    match engine.run_ticker_cycle(&request).await? {
        CycleOutcome::Completed(update) => {
            println!(
                "Ticker: {:.2} (base candle {:?})",
                update.ticker.last_price, update.base
            );
        }
        CycleOutcome::Skipped(reason) => println!("Ticker skipped: {:?}", reason),
    }

    Ok(())
}

fn print_tier(label: &str, tier: &TierState) {
    let signal = tier
        .signal
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string());
    println!(
        "  {:<5} {:>4} closed  {:<6} signal {} (marker {})",
        label,
        tier.closed.len(),
        if tier.in_progress.is_some() { "+open" } else { "" },
        signal,
        tier.marker
    );
}

/// Print a fetch or recalculation result.
pub(crate) fn print_summary(result: &FetchResult) {
    println!();
    println!("{}", result.status);
    print_tier(&result.base.granularity, &result.base);
    if let Some(htf) = &result.htf {
        print_tier(&htf.granularity, htf);
    }
    println!();
}
