//! Live working set of a session.

use serde::{Deserialize, Serialize};
use sync_core::types::{Candle, CandleSeries, FetchRequest, SignalResult, SignalType, SignalStrength};

/// Series, signal and marker of one granularity tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierState {
    pub granularity: String,
    pub closed: CandleSeries,
    pub in_progress: Option<Candle>,
    pub signal: Option<SignalResult>,
    pub marker: i64,
}

impl TierState {
    pub fn new(granularity: impl Into<String>) -> Self {
        Self {
            granularity: granularity.into(),
            marker: -1,
            ..Self::default()
        }
    }

    /// Closed candles followed by the in-progress candle.
    pub fn all(&self) -> Vec<Candle> {
        self.closed.with_in_progress(self.in_progress.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.in_progress.is_none()
    }

    /// Oldest and newest timestamps over all candles.
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        let all = self.all();
        Some((all.first()?.timestamp, all.last()?.timestamp))
    }

    pub fn clear(&mut self) {
        self.closed.clear();
        self.in_progress = None;
        self.signal = None;
        self.marker = -1;
    }
}

/// What the presenter currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    /// Request of the last successful fetch, restore or recalculation
    pub request: Option<FetchRequest>,
    pub base: TierState,
    pub htf: Option<TierState>,
    /// Real-time updates toggle; the scheduler refuses to start without it
    pub live_updates: bool,
    /// Backtest mode: ticker-only polling and recalculation allowed
    pub backtest: bool,
}

impl LiveState {
    pub fn new() -> Self {
        Self {
            base: TierState::new(""),
            live_updates: true,
            ..Self::default()
        }
    }

    /// Drop series and signals, keep the toggles.
    pub fn clear_series(&mut self) {
        self.base.clear();
        self.htf = None;
    }
}

type SignalKey = (SignalType, SignalStrength);

/// Change detection for real-time notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationTracker {
    pushed: bool,
    last: Option<SignalKey>,
    last_htf: Option<SignalKey>,
}

impl NotificationTracker {
    /// Record the latest signals. Returns whether a notification is due:
    /// the first push, or a change of type or strength in either tier.
    pub fn observe(&mut self, base: &SignalResult, htf: Option<&SignalResult>) -> bool {
        let key = base.key();
        let htf_key = htf.map(SignalResult::key);
        let changed = self.last != Some(key);
        let htf_changed = htf_key.is_some() && self.last_htf != htf_key;
        let notify = !self.pushed || changed || htf_changed;

        self.pushed = true;
        self.last = Some(key);
        if htf_key.is_some() {
            self.last_htf = htf_key;
        }
        notify
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
