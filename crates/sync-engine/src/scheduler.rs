//! Real-time polling.
//!
//! The scheduler owns two pollers, one per operation class. Live mode polls
//! OHLCV and ticker; backtest mode polls the ticker only so the in-progress
//! candle keeps moving while the candle history stays frozen for
//! recalculation. Every tick runs its cycle as a separate task; overlapping
//! cycles are resolved by the engine's admission gate, not here.

use crate::engine::SyncEngine;
use crate::messages;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use sync_core::{
    error::{SyncError, SyncResult},
    types::{FetchRequest, OperationClass},
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMode {
    Stopped,
    LivePolling,
    BacktestPolling,
}

/// Polling periods of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub ohlcv: Duration,
    pub ticker: Duration,
}

#[derive(Default)]
struct Pollers {
    token: Option<CancellationToken>,
    request: Option<FetchRequest>,
    handles: Vec<JoinHandle<()>>,
}

struct SchedulerState {
    mode: SchedulerMode,
    pollers: Pollers,
    /// Poller tasks of stopped runs, awaited by `join`
    draining: Vec<JoinHandle<()>>,
}

/// Timer-driven OHLCV and ticker polling for one engine.
pub struct RealTimeScheduler {
    engine: Arc<SyncEngine>,
    state: Mutex<SchedulerState>,
}

impl RealTimeScheduler {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(SchedulerState {
                mode: SchedulerMode::Stopped,
                pollers: Pollers::default(),
                draining: Vec::new(),
            }),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn mode(&self) -> SchedulerMode {
        self.state.lock().mode
    }

    pub fn is_running(&self) -> bool {
        self.mode() != SchedulerMode::Stopped
    }

    /// Request currently being polled.
    pub fn request(&self) -> Option<FetchRequest> {
        self.state.lock().pollers.request.clone()
    }

    /// OHLCV: `max(1000 / limit, floor)` scaled by the exchange's multiplier.
    /// Ticker: `max(1000 / limit, 100 ms)`.
    pub fn poll_intervals(&self, request: &FetchRequest) -> SyncResult<PollIntervals> {
        let (_, profile, _) = self.engine.prepare(request)?;
        let plan = self.engine.settings().plan;
        Ok(PollIntervals {
            ohlcv: profile.poll_interval(profile.rate_limit(OperationClass::Ohlcv, request.with_htf, plan)),
            ticker: profile.ticker_poll_interval(profile.rate_limit(OperationClass::Ticker, request.with_htf, plan)),
        })
    }

    /// Start polling `request`, replacing any running pollers. Must be called
    /// from within a tokio runtime.
    pub fn start(&self, request: FetchRequest) -> SyncResult<SchedulerMode> {
        self.stop();

        if !self.engine.live_updates() {
            return Err(SyncError::Scheduler("Live updates are disabled".into()));
        }
        let intervals = self.poll_intervals(&request)?;
        self.engine.reset_notifications();

        let backtest = self.engine.is_backtest();
        let mode = if backtest {
            SchedulerMode::BacktestPolling
        } else {
            SchedulerMode::LivePolling
        };

        let token = CancellationToken::new();
        let mut handles = Vec::with_capacity(2);
        if !backtest {
            handles.push(spawn_poller(
                self.engine.clone(),
                request.clone(),
                OperationClass::Ohlcv,
                intervals.ohlcv,
                token.clone(),
            ));
        }
        handles.push(spawn_poller(
            self.engine.clone(),
            request.clone(),
            OperationClass::Ticker,
            intervals.ticker,
            token.clone(),
        ));

        info!(
            mode = ?mode,
            symbol = %request.symbol,
            granularity = %request.granularity,
            ohlcv_ms = intervals.ohlcv.as_millis() as u64,
            ticker_ms = intervals.ticker.as_millis() as u64,
            "Real-time polling started"
        );
        self.engine.presenter().on_status(
            &messages::polling_started_status(&request.symbol, &request.granularity, backtest),
            true,
        );

        let mut state = self.state.lock();
        state.mode = mode;
        state.pollers = Pollers {
            token: Some(token),
            request: Some(request),
            handles,
        };
        Ok(mode)
    }

    /// Stop polling and cancel in-flight calls. Safe in any state; the
    /// presenter only hears about it when pollers were running.
    pub fn stop(&self) {
        let token = {
            let mut state = self.state.lock();
            state.mode = SchedulerMode::Stopped;
            let Pollers { token, handles, .. } = std::mem::take(&mut state.pollers);
            state.draining.extend(handles);
            token
        };
        if let Some(token) = token {
            token.cancel();
            info!("Real-time polling stopped");
            self.engine
                .presenter()
                .on_status(messages::POLLING_STOPPED_STATUS, true);
        }
        self.engine.cancel_in_flight();
    }

    /// Toggle backtest mode, restarting the pollers when running.
    pub fn set_backtest(&self, enabled: bool) -> SyncResult<SchedulerMode> {
        self.engine.set_backtest(enabled);
        let running = {
            let state = self.state.lock();
            (state.mode != SchedulerMode::Stopped)
                .then(|| state.pollers.request.clone())
                .flatten()
        };
        match running {
            Some(request) => self.start(request),
            None => Ok(SchedulerMode::Stopped),
        }
    }

    /// Stop polling and clear the engine's snapshots and live state.
    pub fn reset(&self) {
        self.stop();
        self.engine.reset();
    }

    /// Wait for the poller tasks to exit after [`RealTimeScheduler::stop`].
    pub async fn join(&self) {
        let handles = std::mem::take(&mut self.state.lock().draining);
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Drop for RealTimeScheduler {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().pollers.token.take() {
            token.cancel();
        }
    }
}

fn spawn_poller(
    engine: Arc<SyncEngine>,
    request: FetchRequest,
    op: OperationClass,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticks.tick() => {
                    let engine = engine.clone();
                    let request = request.clone();
                    let token = token.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {}
                            _ = run_cycle(&engine, &request, op) => {}
                        }
                    });
                }
            }
        }
        debug!(op = %op, "Poller exited");
    })
}

async fn run_cycle(engine: &SyncEngine, request: &FetchRequest, op: OperationClass) {
    let outcome = match op {
        OperationClass::Ohlcv => engine
            .run_ohlcv_cycle(request, true)
            .await
            .map(|o| o.skip_reason()),
        OperationClass::Ticker => engine
            .run_ticker_cycle(request)
            .await
            .map(|o| o.skip_reason()),
    };
    match outcome {
        Ok(Some(reason)) => debug!(op = %op, reason = ?reason, "Cycle skipped"),
        Ok(None) => {}
        // already surfaced through the presenter
        Err(e) => debug!(op = %op, error = %e, "Cycle failed"),
    }
}
