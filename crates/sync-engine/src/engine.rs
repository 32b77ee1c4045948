//! Session orchestration.
//!
//! One [`SyncEngine`] owns the state of a single session: the live working
//! set shown by the presenter, both snapshots, the admission gate and the
//! rate budget. OHLCV and ticker cycles run through it, from the scheduler or
//! from one-shot callers.

use crate::admission::{Admission, AdmissionGate};
use crate::messages;
use crate::rate_budget::{RateBudget, RateDecision};
use crate::reconciler::{patch_close, reconcile, PatchOutcome, Reconciled};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::state::{LiveState, NotificationTracker, TierState};
use crate::window::{base_window, htf_window, marker_index};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use sync_core::{
    error::{ExchangeError, SyncError, SyncResult, ValidationError},
    traits::{ChartUpdate, Clock, ExchangeAdapter, Presenter},
    types::{ApiPlan, ExchangeProfile, FetchRequest, OperationClass, Symbol, Ticker},
};
use sync_data::ExchangeRegistry;
use sync_signals::SignalPipeline;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Account plan capping the per-second limits
    pub plan: ApiPlan,
    /// Pause after the provider reports throttling
    pub provider_backoff: Duration,
    /// Added to every local rate-limit wait
    pub rate_slack: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            plan: ApiPlan::Enterprise,
            provider_backoff: Duration::from_secs(60),
            rate_slack: Duration::from_millis(10),
        }
    }
}

/// Why a cycle did nothing. Skips are routine and never surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another call of the same class is in flight
    InFlight,
    /// The pending threshold was hit and the in-flight call cancelled
    GateReset,
    /// Local per-second budget spent
    RateBudget,
    /// The provider answered 429; the backoff was served
    ProviderThrottled,
    /// A previous 429 backoff is still running
    ProviderBackoff,
    /// The call was cancelled
    Cancelled,
}

/// Outcome of a cycle that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome<T> {
    Completed(T),
    Skipped(SkipReason),
}

impl<T> CycleOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            CycleOutcome::Completed(value) => Some(value),
            CycleOutcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            CycleOutcome::Completed(_) => None,
            CycleOutcome::Skipped(reason) => Some(*reason),
        }
    }
}

/// Result of a completed OHLCV cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub base: TierState,
    pub htf: Option<TierState>,
    pub status: String,
    /// Whether a signal notification was emitted
    pub notified: bool,
}

/// Result of a completed ticker cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerUpdate {
    pub ticker: Ticker,
    pub base: PatchOutcome,
    pub htf: Option<PatchOutcome>,
}

#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) live: LiveState,
    pub(crate) snapshots: SnapshotStore,
    pub(crate) notifications: NotificationTracker,
    /// Provider backoff deadline (Unix ms)
    pub(crate) backoff_until: Option<i64>,
}

struct Fetched {
    base: Reconciled,
    htf: Option<(String, Reconciled)>,
}

/// Candle and ticker synchronization for one session.
pub struct SyncEngine {
    session_id: Uuid,
    registry: ExchangeRegistry,
    pipeline: SignalPipeline,
    presenter: Arc<dyn Presenter>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    gate: AdmissionGate,
    rate: Mutex<RateBudget>,
    pub(crate) session: Mutex<Session>,
}

impl SyncEngine {
    pub fn new(
        registry: ExchangeRegistry,
        pipeline: SignalPipeline,
        presenter: Arc<dyn Presenter>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(%session_id, exchanges = registry.len(), plan = ?settings.plan, "Sync engine created");
        Self {
            session_id,
            registry,
            pipeline,
            presenter,
            clock,
            rate: Mutex::new(RateBudget::new(settings.rate_slack)),
            settings,
            gate: AdmissionGate::new(),
            session: Mutex::new(Session {
                live: LiveState::new(),
                snapshots: SnapshotStore::new(),
                notifications: NotificationTracker::default(),
                backoff_until: None,
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ExchangeRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Copy of the live working set.
    pub fn live(&self) -> LiveState {
        self.session.lock().live.clone()
    }

    pub fn initial_snapshot(&self) -> Option<Snapshot> {
        self.session.lock().snapshots.initial().ok().cloned()
    }

    pub fn recent_snapshot(&self) -> Option<Snapshot> {
        self.session.lock().snapshots.recent().ok().cloned()
    }

    pub fn set_live_updates(&self, enabled: bool) {
        self.session.lock().live.live_updates = enabled;
    }

    pub fn live_updates(&self) -> bool {
        self.session.lock().live.live_updates
    }

    pub fn set_backtest(&self, enabled: bool) {
        self.session.lock().live.backtest = enabled;
    }

    pub fn is_backtest(&self) -> bool {
        self.session.lock().live.backtest
    }

    /// Cancel whatever is in flight and zero the pending counters.
    pub fn cancel_in_flight(&self) {
        self.gate.cancel_all();
    }

    pub fn reset_notifications(&self) {
        self.session.lock().notifications.reset();
    }

    /// Clear both snapshots, the live series, notification state and any
    /// provider backoff. Toggles survive.
    pub fn reset(&self) {
        self.gate.cancel_all();
        self.rate.lock().reset();
        {
            let mut session = self.session.lock();
            session.live.clear_series();
            session.live.request = None;
            session.snapshots.reset();
            session.notifications.reset();
            session.backoff_until = None;
        }
        info!(session_id = %self.session_id, "Session reset");

        self.presenter.on_table_refresh(&[]);
        self.presenter
            .on_chart_update(&chart_update(&TierState::new(""), None, false));
        self.presenter.on_status(messages::RESET_STATUS, true);
    }

    /// Resolve the adapter and profile of a request and validate it.
    pub fn prepare(
        &self,
        request: &FetchRequest,
    ) -> SyncResult<(Arc<dyn ExchangeAdapter>, ExchangeProfile, Symbol)> {
        let adapter = self.registry.get(&request.exchange_id)?;
        let profile = ExchangeProfile::for_id(adapter.id());
        let symbol = request.validate(&profile, adapter.granularity_map())?;
        Ok((adapter, profile, symbol))
    }

    /// Run one OHLCV cycle: fetch base and HTF candles, reconcile, generate
    /// signals, record the initial snapshot and notify the presenter.
    #[instrument(skip(self, request), fields(exchange = %request.exchange_id, symbol = %request.symbol, granularity = %request.granularity))]
    pub async fn run_ohlcv_cycle(
        &self,
        request: &FetchRequest,
        is_real_time: bool,
    ) -> SyncResult<CycleOutcome<FetchResult>> {
        let (adapter, profile, symbol) = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.surface(e)),
        };

        if self.backoff_active() {
            return Ok(CycleOutcome::Skipped(SkipReason::ProviderBackoff));
        }

        let permit = match self.gate.try_enter(OperationClass::Ohlcv, profile.max_pending) {
            Admission::Admitted(permit) => permit,
            Admission::InFlight { .. } => return Ok(CycleOutcome::Skipped(SkipReason::InFlight)),
            Admission::Reset => return Ok(CycleOutcome::Skipped(SkipReason::GateReset)),
        };

        let limit = profile.rate_limit(OperationClass::Ohlcv, request.with_htf, self.settings.plan);
        if let Some(skip) = self
            .consume_rate(OperationClass::Ohlcv, limit, permit.token())
            .await
        {
            return Ok(CycleOutcome::Skipped(skip));
        }

        match self
            .fetch_tiers(adapter.as_ref(), request, &symbol, permit.token())
            .await
        {
            Ok(fetched) => {
                let result = self.apply_fetch(request, adapter.id(), fetched, is_real_time);
                Ok(CycleOutcome::Completed(result))
            }
            Err(e) => self.handle_failure(e, permit.token(), true).await,
        }
    }

    /// Run one ticker cycle and patch the in-progress candles of the live
    /// working set with the last price.
    #[instrument(skip(self, request), fields(exchange = %request.exchange_id, symbol = %request.symbol))]
    pub async fn run_ticker_cycle(
        &self,
        request: &FetchRequest,
    ) -> SyncResult<CycleOutcome<TickerUpdate>> {
        let (adapter, profile, symbol) = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.surface(e)),
        };

        if self.backoff_active() {
            return Ok(CycleOutcome::Skipped(SkipReason::ProviderBackoff));
        }

        let permit = match self.gate.try_enter(OperationClass::Ticker, profile.max_pending) {
            Admission::Admitted(permit) => permit,
            Admission::InFlight { .. } => return Ok(CycleOutcome::Skipped(SkipReason::InFlight)),
            Admission::Reset => return Ok(CycleOutcome::Skipped(SkipReason::GateReset)),
        };

        let limit = profile.rate_limit(OperationClass::Ticker, request.with_htf, self.settings.plan);
        if let Some(skip) = self
            .consume_rate(OperationClass::Ticker, limit, permit.token())
            .await
        {
            return Ok(CycleOutcome::Skipped(skip));
        }

        let ticker = match adapter.fetch_ticker(&symbol, permit.token()).await {
            Ok(ticker) => ticker,
            Err(e) => return self.handle_failure(e.into(), permit.token(), false).await,
        };

        let (update, chart) = {
            let mut session = self.session.lock();
            let live = &mut session.live;
            let same_market = live.request.as_ref().is_some_and(|r| {
                r.exchange_id.eq_ignore_ascii_case(&request.exchange_id) && r.symbol == request.symbol
            });
            if same_market {
                let signal_input = live.request.as_ref().is_some_and(|r| r.with_latest_candle);
                let base = if signal_input {
                    debug!("In-progress base candle is signal input, close not patched");
                    PatchOutcome::SignalInput
                } else {
                    patch_close(&mut live.base.in_progress, &ticker)
                };
                let htf = live.htf.as_mut().map(|h| patch_close(&mut h.in_progress, &ticker));
                let patched = base == PatchOutcome::Patched || htf == Some(PatchOutcome::Patched);
                let chart = patched.then(|| chart_update(&live.base, live.htf.as_ref(), true));
                (TickerUpdate { ticker, base, htf }, chart)
            } else {
                debug!("Live state belongs to another market, ticker not applied");
                (
                    TickerUpdate {
                        ticker,
                        base: PatchOutcome::NoCandle,
                        htf: None,
                    },
                    None,
                )
            }
        };

        self.presenter.on_ticker(&ticker);
        if let Some(chart) = chart {
            self.presenter.on_chart_update(&chart);
        }
        Ok(CycleOutcome::Completed(update))
    }

    fn backoff_active(&self) -> bool {
        let now = self.clock.now_ms();
        match self.session.lock().backoff_until {
            Some(until) if now < until => {
                debug!(remaining_ms = until - now, "Provider backoff active, skipping");
                true
            }
            _ => false,
        }
    }

    /// Charge one call to the budget. A denial waits out the window and
    /// skips the cycle.
    async fn consume_rate(
        &self,
        op: OperationClass,
        limit_per_second: u32,
        token: &CancellationToken,
    ) -> Option<SkipReason> {
        let decision = {
            let mut rate = self.rate.lock();
            rate.set_limit(op, limit_per_second);
            rate.admit(op, self.clock.now_ms())
        };
        match decision {
            RateDecision::Admitted => None,
            RateDecision::Denied { wait } => {
                debug!(op = %op, wait_ms = wait.as_millis() as u64, "Rate budget spent, waiting for next window");
                if sleep_unless_cancelled(wait, token).await {
                    Some(SkipReason::RateBudget)
                } else {
                    Some(SkipReason::Cancelled)
                }
            }
        }
    }

    async fn fetch_tiers(
        &self,
        adapter: &dyn ExchangeAdapter,
        request: &FetchRequest,
        symbol: &Symbol,
        token: &CancellationToken,
    ) -> SyncResult<Fetched> {
        let granularities = adapter.granularity_map();
        let granularity_ms = granularities
            .millis(&request.granularity)
            .ok_or_else(|| ValidationError::UnknownGranularity(request.granularity.clone()))?;

        let window = base_window(request.window(), granularity_ms, request.limit, self.clock.now_ms());
        let raw = adapter
            .fetch_ohlcv(symbol, &request.granularity, window.start, window.end, request.limit, token)
            .await?;
        debug!(count = raw.len(), start = window.start, end = window.end, "Base candles fetched");
        let base = reconcile(raw, self.clock.now_ms(), granularity_ms, request.limit as usize);
        if base.closed.is_empty() && base.in_progress.is_none() {
            return Err(ExchangeError::NoDataAvailable.into());
        }

        let htf = if request.with_htf {
            let higher = adapter
                .next_higher_timeframe(&request.granularity)
                .and_then(|label| granularities.millis(&label).map(|ms| (label, ms)));
            match higher {
                Some((label, htf_ms)) => {
                    let window = htf_window(htf_ms, request.htf_limit, self.clock.now_ms());
                    let raw = adapter
                        .fetch_ohlcv(symbol, &label, window.start, window.end, request.htf_limit, token)
                        .await?;
                    debug!(htf = %label, count = raw.len(), "HTF candles fetched");
                    let reconciled =
                        reconcile(raw, self.clock.now_ms(), htf_ms, request.htf_limit as usize);
                    Some((label, reconciled))
                }
                None => {
                    warn!("No higher timeframe available, continuing without HTF");
                    None
                }
            }
        } else {
            None
        };

        Ok(Fetched { base, htf })
    }

    fn apply_fetch(
        &self,
        request: &FetchRequest,
        exchange_id: &str,
        fetched: Fetched,
        is_real_time: bool,
    ) -> FetchResult {
        let base = self.analyze(&request.granularity, fetched.base, request);
        let htf = fetched
            .htf
            .map(|(label, reconciled)| self.analyze(&label, reconciled, request));

        let base_count = base.all().len();
        let htf_summary = htf
            .as_ref()
            .filter(|h| !h.closed.is_empty())
            .map(|h| (h.granularity.as_str(), h.all().len(), request.htf_limit));
        let status = messages::processed_status(&request.symbol, &request.granularity, base_count, htf_summary);

        let now = self.clock.now_ms();
        let notify = {
            let mut session = self.session.lock();
            session.live.request = Some(request.clone());
            session.live.base = base.clone();
            session.live.htf = htf.clone();
            session
                .snapshots
                .record_initial(Snapshot::new(request.clone(), base.clone(), htf.clone(), now));

            match (is_real_time && !request.with_latest_candle, base.signal.as_ref()) {
                (true, Some(signal)) => session
                    .notifications
                    .observe(signal, htf.as_ref().and_then(|h| h.signal.as_ref())),
                _ => false,
            }
        };

        info!(candles = base_count, marker = base.marker, htf = htf.is_some(), "OHLCV cycle completed");
        self.presenter.on_table_refresh(base.closed.as_slice());
        self.presenter
            .on_chart_update(&chart_update(&base, htf.as_ref(), is_real_time));
        self.presenter.on_status(&status, true);

        if notify {
            if let Some(signal) = base.signal.as_ref() {
                let htf_part = htf
                    .as_ref()
                    .and_then(|h| h.signal.as_ref().map(|s| (h.granularity.as_str(), s)));
                let text = messages::notification_text(
                    &request.symbol,
                    exchange_id,
                    &request.granularity,
                    now,
                    signal,
                    htf_part,
                );
                info!(notification = %text, "Signal changed");
                self.presenter.on_status(&text, true);
                self.presenter.on_notification(&text);
            }
        }

        FetchResult {
            base,
            htf,
            status,
            notified: notify,
        }
    }

    /// Build a tier from reconciled candles: run the request's generator over
    /// the signal candidates and place the marker.
    fn analyze(&self, granularity: &str, reconciled: Reconciled, request: &FetchRequest) -> TierState {
        let all = reconciled.all();
        let candidates = if request.with_latest_candle {
            all.as_slice()
        } else {
            reconciled.closed.as_slice()
        };
        let signal = self.pipeline.generate(request.signal_variant, candidates);
        let marker = marker_index(
            all.len(),
            reconciled.in_progress.is_some(),
            request.with_latest_candle,
            candidates.len(),
        );
        TierState {
            granularity: granularity.to_string(),
            closed: reconciled.closed,
            in_progress: reconciled.in_progress,
            signal: Some(signal),
            marker,
        }
    }

    /// Re-run the generator over a restored tier, keeping its marker.
    pub(crate) fn reanalyze(&self, mut tier: TierState, request: &FetchRequest) -> TierState {
        let candidates = if request.with_latest_candle {
            tier.all()
        } else {
            tier.closed.as_slice().to_vec()
        };
        tier.signal = Some(self.pipeline.generate(request.signal_variant, &candidates));
        tier
    }

    pub(crate) fn pipeline(&self) -> &SignalPipeline {
        &self.pipeline
    }

    pub(crate) fn presenter(&self) -> &dyn Presenter {
        self.presenter.as_ref()
    }

    /// Classify a failed call. Throttling and cancellation become skips;
    /// anything else clears the live series (snapshots survive) when
    /// `clear_live` is set, and is surfaced.
    async fn handle_failure<T>(
        &self,
        err: SyncError,
        token: &CancellationToken,
        clear_live: bool,
    ) -> SyncResult<CycleOutcome<T>> {
        match err {
            SyncError::RateLimited { retry_after } => {
                let backoff = self.settings.provider_backoff;
                warn!(
                    retry_after_secs = retry_after.as_secs(),
                    backoff_secs = backoff.as_secs(),
                    "Provider rate limit hit, backing off"
                );
                let until = self.clock.now_ms() + backoff.as_millis() as i64;
                self.session.lock().backoff_until = Some(until);
                if sleep_unless_cancelled(backoff, token).await {
                    Ok(CycleOutcome::Skipped(SkipReason::ProviderThrottled))
                } else {
                    Ok(CycleOutcome::Skipped(SkipReason::Cancelled))
                }
            }
            SyncError::Cancelled => {
                debug!("Call cancelled");
                Ok(CycleOutcome::Skipped(SkipReason::Cancelled))
            }
            other => {
                error!(error = %other, "Cycle failed");
                if clear_live {
                    self.session.lock().live.clear_series();
                    self.presenter.on_table_refresh(&[]);
                }
                self.presenter
                    .on_status(&messages::error_status(&other), false);
                Err(other)
            }
        }
    }

    /// Report an error that stopped a call before any network access.
    pub(crate) fn surface(&self, err: SyncError) -> SyncError {
        warn!(error = %err, "Request rejected");
        self.presenter.on_status(&messages::error_status(&err), false);
        err
    }
}

/// Chart payload for the given tiers.
pub(crate) fn chart_update(base: &TierState, htf: Option<&TierState>, is_real_time: bool) -> ChartUpdate {
    ChartUpdate {
        signal: base.signal.clone(),
        candles: base.closed.as_slice().to_vec(),
        in_progress: base.in_progress,
        is_real_time,
        htf_candles: htf.map(|h| h.closed.as_slice().to_vec()).unwrap_or_default(),
        htf_in_progress: htf.and_then(|h| h.in_progress),
        htf_signal: htf.and_then(|h| h.signal.clone()),
        marker_index: base.marker,
        htf_marker_index: htf.map_or(-1, |h| h.marker),
    }
}

/// Sleep for `duration`. Returns false when `token` fired first.
pub(crate) async fn sleep_unless_cancelled(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hour_candles, test_engine, Event, HOUR, NOW};
    use sync_core::types::{Candle, SignalVariant};

    fn request() -> FetchRequest {
        FetchRequest::new("simulated", "BTC/USDT", "1h")
    }

    #[tokio::test]
    async fn test_two_hundred_closed_candles() {
        let (engine, exchange, presenter) = test_engine();
        exchange.script_ohlcv(Ok(hour_candles(NOW / HOUR - 200, 200)));

        let outcome = engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        let result = outcome.completed().unwrap();
        assert_eq!(result.base.closed.len(), 200);
        assert!(result.base.in_progress.is_none());
        assert_eq!(result.base.marker, 199);
        assert_eq!(result.status, "Processed 200 candles for BTC/USDT (1h)");

        let snapshot = engine.initial_snapshot().unwrap();
        assert_eq!(snapshot.base, result.base);
        assert!(presenter.events().contains(&Event::Status(result.status.clone(), true)));
        assert_eq!(presenter.table_sizes(), vec![200]);
    }

    #[tokio::test]
    async fn test_generated_window_with_htf() {
        let (engine, exchange, presenter) = test_engine();
        let req = request().with_htf(true);

        let result = engine.run_ohlcv_cycle(&req, false).await.unwrap().completed().unwrap();
        assert!(result.base.in_progress.is_some());
        assert!(result.base.closed.len() <= 200);
        assert_eq!(result.base.marker, result.base.closed.len() as i64 - 1);

        let htf = result.htf.unwrap();
        assert_eq!(htf.granularity, "4h");
        assert!(htf.closed.len() <= 60);
        assert!(htf.in_progress.is_some());
        assert_eq!(exchange.ohlcv_calls(), 2);
        assert!(result.status.contains("for 4h (HTF limit: 60)"));
        assert_eq!(presenter.charts().len(), 1);
    }

    #[tokio::test]
    async fn test_with_latest_candle_moves_marker() {
        let (engine, _exchange, _presenter) = test_engine();
        let req = request().with_latest_candle(true);
        let result = engine.run_ohlcv_cycle(&req, false).await.unwrap().completed().unwrap();
        assert!(result.base.in_progress.is_some());
        assert_eq!(result.base.marker, result.base.closed.len() as i64);
    }

    #[tokio::test]
    async fn test_limit_validated_before_admission() {
        let (engine, exchange, presenter) = test_engine();
        let err = engine
            .run_ohlcv_cycle(&request().with_limit(1500), false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::LimitOutOfRange { value: 1500, .. })
        ));
        assert_eq!(exchange.ohlcv_calls(), 0);
        assert!(!engine.gate().is_in_flight(OperationClass::Ohlcv));
        assert_eq!(engine.gate().pending(OperationClass::Ohlcv), 0);
        assert!(matches!(presenter.events().last(), Some(Event::Status(_, false))));
    }

    #[tokio::test]
    async fn test_unknown_exchange_is_surfaced() {
        let (engine, _exchange, presenter) = test_engine();
        let req = FetchRequest::new("kraken", "BTC/USDT", "1h");
        let err = engine.run_ohlcv_cycle(&req, false).await.unwrap_err();
        assert!(matches!(err, SyncError::AdapterUnavailable(_)));
        assert_eq!(
            presenter.events(),
            vec![Event::Status("Error: Unsupported exchange: kraken".into(), false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_throttling_backs_off() {
        let (engine, exchange, presenter) = test_engine();
        exchange.script_ohlcv(Err(ExchangeError::RateLimited { retry_after_secs: 60 }));

        let started = tokio::time::Instant::now();
        let outcome = engine.run_ohlcv_cycle(&request(), true).await.unwrap();
        assert_eq!(outcome.skip_reason(), Some(SkipReason::ProviderThrottled));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
        assert!(engine.initial_snapshot().is_none());
        assert!(presenter.events().is_empty());

        let outcome = engine.run_ohlcv_cycle(&request(), true).await.unwrap();
        assert!(outcome.is_completed());
        assert!(engine.initial_snapshot().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_skip_during_backoff() {
        let (engine, exchange, _presenter) = test_engine();
        exchange.script_ohlcv(Err(ExchangeError::RateLimited { retry_after_secs: 60 }));
        let engine = Arc::new(engine);

        let throttled = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_ohlcv_cycle(&request(), true).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let ticker = engine.run_ticker_cycle(&request()).await.unwrap();
        assert_eq!(ticker.skip_reason(), Some(SkipReason::ProviderBackoff));
        assert_eq!(exchange.ticker_calls(), 0);

        let ohlcv = throttled.await.unwrap().unwrap();
        assert_eq!(ohlcv.skip_reason(), Some(SkipReason::ProviderThrottled));
        assert!(engine.run_ticker_cycle(&request()).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_transient_error_clears_live_keeps_snapshot() {
        let (engine, exchange, presenter) = test_engine();
        engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        let snapshot = engine.initial_snapshot().unwrap();

        exchange.script_ohlcv(Err(ExchangeError::Connection("reset by peer".into())));
        let err = engine.run_ohlcv_cycle(&request(), false).await.unwrap_err();
        assert!(matches!(err, SyncError::Transient(_)));

        assert!(engine.live().base.is_empty());
        assert_eq!(engine.initial_snapshot(), Some(snapshot));
        assert_eq!(presenter.table_sizes().last(), Some(&0));
        assert_eq!(
            presenter.events().last(),
            Some(&Event::Status(
                "Error: Network error: Connection error: reset by peer".into(),
                false
            ))
        );
    }

    #[tokio::test]
    async fn test_empty_window_is_an_error() {
        let (engine, exchange, _presenter) = test_engine();
        exchange.script_ohlcv(Ok(Vec::new()));
        let err = engine.run_ohlcv_cycle(&request(), false).await.unwrap_err();
        assert!(matches!(err, SyncError::Transient(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_calls_reset_after_max_pending() {
        let (engine, exchange, _presenter) = test_engine();
        exchange.set_latency(Duration::from_secs(5));
        let engine = Arc::new(engine);

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_ohlcv_cycle(&request(), true).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(engine.gate().is_in_flight(OperationClass::Ohlcv));

        let second = engine.run_ohlcv_cycle(&request(), true).await.unwrap();
        assert_eq!(second.skip_reason(), Some(SkipReason::InFlight));
        let third = engine.run_ohlcv_cycle(&request(), true).await.unwrap();
        assert_eq!(third.skip_reason(), Some(SkipReason::GateReset));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.skip_reason(), Some(SkipReason::Cancelled));
        assert_eq!(engine.gate().pending(OperationClass::Ohlcv), 0);

        exchange.set_latency(Duration::ZERO);
        assert!(engine.run_ohlcv_cycle(&request(), true).await.unwrap().is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_budget_denial_waits_and_skips() {
        let (engine, _exchange, _presenter) = test_engine();
        // standard tier: 5 OHLCV calls per second
        for _ in 0..5 {
            assert!(engine.run_ohlcv_cycle(&request(), false).await.unwrap().is_completed());
        }
        let started = tokio::time::Instant::now();
        let denied = engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        assert_eq!(denied.skip_reason(), Some(SkipReason::RateBudget));
        assert_eq!(started.elapsed(), Duration::from_millis(1010));

        assert!(engine.run_ohlcv_cycle(&request(), false).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_ticker_patches_in_progress_candle() {
        let (engine, exchange, presenter) = test_engine();
        engine.run_ohlcv_cycle(&request().with_htf(true), false).await.unwrap();
        let before = engine.live().base.in_progress.unwrap();

        exchange.script_ticker(Ok(Ticker::new(before.close * 3.0, 50.0, 150.0, NOW)));
        let update = engine
            .run_ticker_cycle(&request().with_htf(true))
            .await
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(update.base, PatchOutcome::OutOfRange);
        assert_eq!(engine.live().base.in_progress.unwrap().close, before.close);

        let price = before.close + 0.5;
        exchange.script_ticker(Ok(Ticker::new(price, 50.0, 150.0, NOW)));
        let update = engine
            .run_ticker_cycle(&request().with_htf(true))
            .await
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(update.base, PatchOutcome::Patched);
        assert_eq!(update.htf, Some(PatchOutcome::Patched));
        let live = engine.live();
        assert_eq!(live.base.in_progress.unwrap().close, price);
        assert_eq!(live.htf.unwrap().in_progress.unwrap().close, price);
        assert_eq!(presenter.tickers(), 2);
        assert!(presenter.charts().last().unwrap().is_real_time);
    }

    #[tokio::test]
    async fn test_ticker_leaves_base_candle_used_as_signal_input() {
        let (engine, exchange, _presenter) = test_engine();
        let req = request().with_htf(true).with_latest_candle(true);
        engine.run_ohlcv_cycle(&req, false).await.unwrap();
        let before = engine.live().base.in_progress.unwrap();

        let price = before.close + 0.5;
        exchange.script_ticker(Ok(Ticker::new(price, 50.0, 150.0, NOW)));
        let update = engine.run_ticker_cycle(&req).await.unwrap().completed().unwrap();

        assert_eq!(update.base, PatchOutcome::SignalInput);
        assert_eq!(update.htf, Some(PatchOutcome::Patched));
        let live = engine.live();
        assert_eq!(live.base.in_progress.unwrap(), before);
        assert_eq!(live.htf.unwrap().in_progress.unwrap().close, price);
    }

    #[tokio::test]
    async fn test_ticker_patch_keeps_high_and_low() {
        let (engine, exchange, _presenter) = test_engine();
        engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        let before = engine.live().base.in_progress.unwrap();

        let price = before.high + 5.0;
        exchange.script_ticker(Ok(Ticker::new(price, 1.0, price + 10.0, NOW)));
        let update = engine.run_ticker_cycle(&request()).await.unwrap().completed().unwrap();

        assert_eq!(update.base, PatchOutcome::Patched);
        let after = engine.live().base.in_progress.unwrap();
        assert_eq!(after.close, price);
        assert_eq!(after.high, before.high);
        assert_eq!(after.low, before.low);
    }

    #[tokio::test]
    async fn test_ticker_error_surfaces_without_clearing() {
        let (engine, exchange, presenter) = test_engine();
        engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        exchange.script_ticker(Err(ExchangeError::Http {
            status: 500,
            message: "boom".into(),
        }));

        assert!(engine.run_ticker_cycle(&request()).await.is_err());
        assert!(!engine.live().base.is_empty());
        assert!(matches!(presenter.events().last(), Some(Event::Status(_, false))));
    }

    #[tokio::test]
    async fn test_notifications_deduplicated_in_real_time() {
        let (engine, exchange, presenter) = test_engine();
        let candles = hour_candles(NOW / HOUR - 200, 200);
        exchange.script_ohlcv(Ok(candles.clone()));
        exchange.script_ohlcv(Ok(candles.clone()));
        exchange.script_ohlcv(Ok(candles));

        let first = engine.run_ohlcv_cycle(&request(), true).await.unwrap().completed().unwrap();
        assert!(first.notified);
        let second = engine.run_ohlcv_cycle(&request(), true).await.unwrap().completed().unwrap();
        assert!(!second.notified);
        assert_eq!(presenter.notifications().len(), 1);
        assert!(presenter.notifications()[0].starts_with("Signal for BTC/USDT on simulated (1h) at "));

        engine.reset_notifications();
        let third = engine.run_ohlcv_cycle(&request(), true).await.unwrap().completed().unwrap();
        assert!(third.notified);
    }

    #[tokio::test]
    async fn test_no_notifications_outside_real_time_or_with_latest() {
        let (engine, _exchange, presenter) = test_engine();
        engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        engine
            .run_ohlcv_cycle(&request().with_latest_candle(true), true)
            .await
            .unwrap();
        assert!(presenter.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_variant_selects_generator() {
        let (engine, exchange, _presenter) = test_engine();
        let mut candles = hour_candles(NOW / HOUR - 200, 199);
        let last = candles[198];
        // breakout above the window high on heavy volume
        candles.push(Candle::new(last.timestamp + HOUR, last.close, 500.0, last.close, 400.0, 1_000.0));
        exchange.script_ohlcv(Ok(candles));

        let req = request().with_signal_variant(SignalVariant::SmartMoney);
        let result = engine.run_ohlcv_cycle(&req, false).await.unwrap().completed().unwrap();
        let signal = result.base.signal.unwrap();
        assert_eq!(signal.signal_type, sync_core::types::SignalType::Buy);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let (engine, _exchange, _presenter) = test_engine();
        engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        engine.reset();
        assert!(engine.initial_snapshot().is_none());
        assert!(engine.live().base.is_empty());
        assert!(engine.live().request.is_none());
        assert!(engine.live_updates());
    }

    #[tokio::test]
    async fn test_reset_clears_presentation() {
        let (engine, _exchange, presenter) = test_engine();
        engine.run_ohlcv_cycle(&request(), false).await.unwrap();
        let before = presenter.events().len();

        engine.reset();
        let after = &presenter.events()[before..];
        assert!(matches!(after[0], Event::Table(0)));
        match &after[1] {
            Event::Chart(chart) => {
                assert!(chart.candles.is_empty());
                assert!(chart.in_progress.is_none());
                assert!(chart.htf_candles.is_empty());
                assert_eq!(chart.marker_index, -1);
            }
            other => panic!("expected chart refresh, got {:?}", other),
        }
        assert_eq!(
            presenter.statuses().last(),
            Some(&(messages::RESET_STATUS.to_string(), true))
        );
    }
}
