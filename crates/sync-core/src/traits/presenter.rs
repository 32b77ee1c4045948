//! Presentation callbacks.

use crate::types::{Candle, SignalResult, Ticker};

/// Payload of [`Presenter::on_chart_update`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChartUpdate {
    /// Base signal, if the pipeline ran
    pub signal: Option<SignalResult>,
    /// Closed base candles
    pub candles: Vec<Candle>,
    /// In-progress base candle
    pub in_progress: Option<Candle>,
    /// Whether the update comes from the real-time scheduler
    pub is_real_time: bool,
    /// Closed HTF candles (empty without HTF)
    pub htf_candles: Vec<Candle>,
    /// In-progress HTF candle
    pub htf_in_progress: Option<Candle>,
    /// HTF signal, if the pipeline ran
    pub htf_signal: Option<SignalResult>,
    /// Index of the candle the base signal is anchored to
    pub marker_index: i64,
    /// Index of the candle the HTF signal is anchored to
    pub htf_marker_index: i64,
}

/// Setter-style callbacks consumed by a UI or console.
///
/// Every method has a no-op default so presenters implement only what they
/// render. Callbacks run on the engine's call path and must not block.
pub trait Presenter: Send + Sync {
    /// Closed base candles changed.
    fn on_table_refresh(&self, _candles: &[Candle]) {}

    /// Series, markers or signals changed.
    fn on_chart_update(&self, _update: &ChartUpdate) {}

    /// Status line. `is_success` is false for surfaced errors.
    fn on_status(&self, _message: &str, _is_success: bool) {}

    /// Push notification for a changed real-time signal.
    fn on_notification(&self, _message: &str) {}

    /// Latest ticker from a successful poll.
    fn on_ticker(&self, _ticker: &Ticker) {}
}

/// Presenter that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
