//! Live polling command implementation.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use sync_config::AppConfig;
use sync_engine::{CycleOutcome, RealTimeScheduler};
use sync_monitor::ConsolePresenter;
use tracing::info;

use super::{build_engine, build_request};
use crate::cli::LiveArgs;

pub async fn run(args: LiveArgs, config: &AppConfig) -> Result<()> {
    let request = build_request(&args.source, config);
    let presenter = Arc::new(ConsolePresenter::new());
    let engine = build_engine(&args.source, config, presenter.clone())?;

    let backtest = args.backtest || config.polling.backtest;
    if backtest {
        // Ticker-only polling patches the candles of one initial fetch.
        if let CycleOutcome::Skipped(reason) = engine.run_ohlcv_cycle(&request, false).await? {
            bail!("Initial fetch skipped: {:?}", reason);
        }
        engine.set_backtest(true);
    }

    let scheduler = RealTimeScheduler::new(engine.clone());
    let intervals = scheduler.poll_intervals(&request)?;
    let mode = scheduler.start(request.clone())?;
    println!(
        "Polling {} on {} ({:?}): OHLCV every {} ms, ticker every {} ms. Press Ctrl-C to stop.",
        request.symbol,
        request.exchange_id,
        mode,
        intervals.ohlcv.as_millis(),
        intervals.ticker.as_millis()
    );

    match args.duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
        }
    }

    info!("Stopping real-time polling");
    scheduler.stop();
    scheduler.join().await;

    println!(
        "Stopped. {} notifications, last ticker {}",
        presenter.notification_count(),
        presenter
            .last_ticker()
            .map(|t| format!("{:.2}", t.last_price))
            .unwrap_or_else(|| "n/a".to_string())
    );
    Ok(())
}
