//! Offline recalculation and snapshot restore.
//!
//! Both operate on the snapshots only and never touch an exchange adapter.

use crate::engine::{chart_update, FetchResult, SyncEngine};
use crate::messages;
use crate::snapshot::Snapshot;
use crate::state::TierState;
use rust_decimal::Decimal;
use sync_core::{
    error::{SnapshotError, SyncError, SyncResult, ValidationError},
    types::{Candle, CandleSeries, FetchRequest, SignalVariant, Symbol},
};
use tracing::{info, warn};

/// Accepted candle limit of a recalculation; values outside are clamped.
pub const RECALC_LIMIT_RANGE: (u32, u32) = (1, 1000);

/// Parameters of [`SyncEngine::recalculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecalcRequest {
    pub exchange_id: String,
    pub symbol: String,
    pub limit: u32,
    /// Inclusive lower bound (Unix ms)
    pub start_time: Option<i64>,
    /// Inclusive upper bound (Unix ms)
    pub end_time: Option<i64>,
    pub trade_size: Decimal,
    pub fee_percent: Decimal,
    pub signal_variant: SignalVariant,
}

impl RecalcRequest {
    /// Parameters mirroring `request`, without a window.
    pub fn from_request(request: &FetchRequest) -> Self {
        Self {
            exchange_id: request.exchange_id.clone(),
            symbol: request.symbol.clone(),
            limit: request.limit,
            start_time: None,
            end_time: None,
            trade_size: request.trade_size,
            fee_percent: request.fee_percent,
            signal_variant: request.signal_variant,
        }
    }

    pub fn with_window(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_signal_variant(mut self, variant: SignalVariant) -> Self {
        self.signal_variant = variant;
        self
    }

    fn validate(&self) -> Result<Symbol, ValidationError> {
        let symbol = Symbol::parse(&self.symbol)?;
        if self.trade_size <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTradeSize);
        }
        if self.fee_percent < Decimal::ZERO {
            return Err(ValidationError::NegativeFee);
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(ValidationError::InvertedWindow { start, end });
            }
        }
        Ok(symbol)
    }

    fn clamped_limit(&self) -> usize {
        let (min, max) = RECALC_LIMIT_RANGE;
        self.limit.clamp(min, max) as usize
    }
}

#[derive(Debug, Clone, Copy)]
enum SnapshotKind {
    Initial,
    Recent,
}

impl SnapshotKind {
    fn label(self) -> &'static str {
        match self {
            SnapshotKind::Initial => "initial",
            SnapshotKind::Recent => "recent",
        }
    }
}

/// Candles inside `[start, end]`, keeping the newest `limit`. Either bound
/// may be absent.
fn filter_window(candles: Vec<Candle>, start: Option<i64>, end: Option<i64>, limit: usize) -> Vec<Candle> {
    let mut kept: Vec<Candle> = candles
        .into_iter()
        .filter(|c| start.map_or(true, |s| c.timestamp >= s) && end.map_or(true, |e| c.timestamp <= e))
        .collect();
    let excess = kept.len().saturating_sub(limit);
    kept.drain(..excess);
    kept
}

impl SyncEngine {
    /// Re-run the signal pipeline over a window of the initial snapshot.
    ///
    /// Allowed in backtest mode only. The result becomes the live working
    /// set and the recent snapshot.
    pub fn recalculate(&self, params: &RecalcRequest) -> SyncResult<FetchResult> {
        self.try_recalculate(params).map_err(|e| self.surface(e))
    }

    fn try_recalculate(&self, params: &RecalcRequest) -> SyncResult<FetchResult> {
        if !self.is_backtest() {
            return Err(ValidationError::NotAllowed(
                "Recalculation not allowed outside backtest mode".into(),
            )
            .into());
        }
        let symbol = params.validate()?;
        let initial = self.session.lock().snapshots.initial()?.clone();

        if !initial.request.exchange_id.eq_ignore_ascii_case(&params.exchange_id) {
            return Err(SnapshotError::ExchangeMismatch {
                current: params.exchange_id.clone(),
                stored: initial.request.exchange_id.clone(),
            }
            .into());
        }
        if initial.request.parsed_symbol().ok().as_ref() != Some(&symbol) {
            return Err(SnapshotError::SymbolMismatch {
                current: params.symbol.clone(),
                stored: initial.request.symbol.clone(),
            }
            .into());
        }

        let limit = params.clamped_limit();
        let base_candles = filter_window(initial.base.all(), params.start_time, params.end_time, limit);
        if base_candles.is_empty() {
            return Err(SnapshotError::EmptyWindow.into());
        }

        let htf_candles = initial.htf.as_ref().and_then(|h| {
            let kept = filter_window(
                h.all(),
                params.start_time,
                params.end_time,
                initial.request.htf_limit as usize,
            );
            if kept.is_empty() {
                warn!(htf = %h.granularity, "No HTF candles in the recalculation window");
                None
            } else {
                Some((h.granularity.clone(), kept))
            }
        });

        let mut request = initial.request.clone();
        request.trade_size = params.trade_size;
        request.fee_percent = params.fee_percent;
        request.signal_variant = params.signal_variant;
        request.start_time = params.start_time;
        request.end_time = params.end_time;

        let base = self.recalc_tier(&request.granularity, base_candles, params.signal_variant);
        let htf = htf_candles.map(|(label, candles)| self.recalc_tier(&label, candles, params.signal_variant));

        let status = messages::recalc_status(&request.symbol, &request.granularity, &request.exchange_id);
        {
            let mut session = self.session.lock();
            session.live.request = Some(request.clone());
            session.live.base = base.clone();
            session.live.htf = htf.clone();
            let taken_at = self.now_ms();
            session
                .snapshots
                .record_recent(Snapshot::new(request.clone(), base.clone(), htf.clone(), taken_at));
        }

        info!(candles = base.closed.len(), htf = htf.is_some(), "Recalculation completed");
        self.presenter().on_table_refresh(base.closed.as_slice());
        self.presenter().on_chart_update(&chart_update(&base, htf.as_ref(), false));
        self.presenter().on_status(&status, true);

        Ok(FetchResult {
            base,
            htf,
            status,
            notified: false,
        })
    }

    /// Every windowed candle is signal input; the marker sits on the last one.
    fn recalc_tier(&self, granularity: &str, candles: Vec<Candle>, variant: SignalVariant) -> TierState {
        let signal = self.pipeline().generate(variant, &candles);
        let marker = candles.len() as i64 - 1;
        TierState {
            granularity: granularity.to_string(),
            closed: CandleSeries::from_candles(candles, 0),
            in_progress: None,
            signal: Some(signal),
            marker,
        }
    }

    /// Replace the live working set with the initial snapshot.
    pub fn restore_initial(&self) -> SyncResult<()> {
        self.restore(SnapshotKind::Initial)
    }

    /// Replace the live working set with the recent snapshot.
    pub fn restore_recent(&self) -> SyncResult<()> {
        self.restore(SnapshotKind::Recent)
    }

    fn restore(&self, kind: SnapshotKind) -> SyncResult<()> {
        let snapshot = {
            let session = self.session.lock();
            match kind {
                SnapshotKind::Initial => session.snapshots.initial().cloned(),
                SnapshotKind::Recent => session.snapshots.recent().cloned(),
            }
        };
        let snapshot = snapshot.map_err(|e| self.surface(SyncError::from(e)))?;

        let base = self.reanalyze(snapshot.base, &snapshot.request);
        let htf = snapshot.htf.map(|h| self.reanalyze(h, &snapshot.request));
        let status = messages::restored_status(kind.label(), &snapshot.request.symbol, &snapshot.request.granularity);
        {
            let mut session = self.session.lock();
            session.live.request = Some(snapshot.request);
            session.live.base = base.clone();
            session.live.htf = htf.clone();
        }

        info!(kind = kind.label(), candles = base.closed.len(), "Snapshot restored");
        self.presenter().on_table_refresh(base.closed.as_slice());
        self.presenter().on_chart_update(&chart_update(&base, htf.as_ref(), false));
        self.presenter().on_status(&status, true);
        Ok(())
    }
}
