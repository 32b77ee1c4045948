//! Shared fixtures for engine tests.

use crate::engine::{EngineSettings, SyncEngine};
use parking_lot::Mutex;
use std::sync::Arc;
use sync_core::traits::{AnchoredClock, ChartUpdate, Presenter};
use sync_core::types::{Candle, Ticker};
use sync_data::{ExchangeRegistry, SimulatedExchange};
use sync_signals::SignalPipeline;

pub(crate) const HOUR: i64 = 3_600_000;
/// Half past an hour, so generated windows carry an in-progress candle.
pub(crate) const NOW: i64 = 472_222 * HOUR + 1_800_000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Table(usize),
    Chart(ChartUpdate),
    Status(String, bool),
    Notification(String),
    Ticker(Ticker),
}

#[derive(Default)]
pub(crate) struct RecordingPresenter {
    events: Mutex<Vec<Event>>,
}

impl RecordingPresenter {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub(crate) fn table_sizes(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Table(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn charts(&self) -> Vec<ChartUpdate> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Chart(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn notifications(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notification(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn statuses(&self) -> Vec<(String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Status(text, ok) => Some((text, ok)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn tickers(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Ticker(_)))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn on_table_refresh(&self, candles: &[Candle]) {
        self.events.lock().push(Event::Table(candles.len()));
    }

    fn on_chart_update(&self, update: &ChartUpdate) {
        self.events.lock().push(Event::Chart(update.clone()));
    }

    fn on_status(&self, message: &str, is_success: bool) {
        self.events
            .lock()
            .push(Event::Status(message.to_string(), is_success));
    }

    fn on_notification(&self, message: &str) {
        self.events
            .lock()
            .push(Event::Notification(message.to_string()));
    }

    fn on_ticker(&self, ticker: &Ticker) {
        self.events.lock().push(Event::Ticker(*ticker));
    }
}

/// Ranging hourly candles opening at `first_hour * HOUR`.
pub(crate) fn hour_candles(first_hour: i64, count: usize) -> Vec<Candle> {
    (0..count as i64)
        .map(|i| {
            let mid = if i % 2 == 0 { 100.0 } else { 101.0 };
            Candle::new((first_hour + i) * HOUR, mid, mid + 1.0, mid - 1.0, mid, 10.0)
        })
        .collect()
}

pub(crate) fn test_engine() -> (SyncEngine, Arc<SimulatedExchange>, Arc<RecordingPresenter>) {
    test_engine_for("simulated")
}

/// Engine over a simulated exchange reporting `exchange_id`, at [`NOW`].
pub(crate) fn test_engine_for(
    exchange_id: &str,
) -> (SyncEngine, Arc<SimulatedExchange>, Arc<RecordingPresenter>) {
    let clock = Arc::new(AnchoredClock::new(NOW));
    let exchange = Arc::new(SimulatedExchange::with_clock(exchange_id, clock.clone()));
    let mut registry = ExchangeRegistry::new();
    registry.register(exchange.clone());
    let presenter = Arc::new(RecordingPresenter::default());
    let engine = SyncEngine::new(
        registry,
        SignalPipeline::default(),
        presenter.clone(),
        clock,
        EngineSettings::default(),
    );
    (engine, exchange, presenter)
}
