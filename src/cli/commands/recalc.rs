//! Offline recalculation command implementation.

use anyhow::{bail, Result};
use std::sync::Arc;
use sync_config::AppConfig;
use sync_engine::{CycleOutcome, RecalcRequest};
use sync_monitor::ConsolePresenter;
use tracing::info;

use super::fetch::print_summary;
use super::{build_engine, build_request, parse_window};
use crate::cli::RecalcArgs;

pub async fn run(args: RecalcArgs, config: &AppConfig) -> Result<()> {
    let (start, end) = parse_window(args.start.as_deref(), args.end.as_deref())?;
    let request = build_request(&args.source, config);
    let engine = build_engine(&args.source, config, Arc::new(ConsolePresenter::new()))?;

    match engine.run_ohlcv_cycle(&request, false).await? {
        CycleOutcome::Completed(result) => print_summary(&result),
        CycleOutcome::Skipped(reason) => bail!("Initial fetch skipped: {:?}", reason),
    }

    engine.set_backtest(true);
    let mut params = RecalcRequest::from_request(&request).with_window(start, end);
    if let Some(keep) = args.keep {
        params = params.with_limit(keep);
    }
    if let Some(variant) = args.recalc_variant {
        params = params.with_signal_variant(variant);
    }

    info!(
        start = ?params.start_time,
        end = ?params.end_time,
        limit = params.limit,
        variant = %params.signal_variant,
        "Recalculating from the initial snapshot"
    );
    let result = engine.recalculate(&params)?;
    print_summary(&result);

    if args.restore {
        engine.restore_initial()?;
        engine.restore_recent()?;
        let live = engine.live();
        println!(
            "Restored initial and recent snapshots; showing {} closed candles",
            live.base.closed.len()
        );
    }

    Ok(())
}
