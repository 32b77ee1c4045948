//! Console presenter.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use sync_core::traits::{ChartUpdate, Presenter};
use sync_core::types::{Candle, SignalResult, Ticker};

const DEFAULT_HISTORY: usize = 50;

/// Rows of the candle table printed on a refresh.
const TABLE_ROWS: usize = 5;

#[derive(Default)]
struct ConsoleState {
    lines: VecDeque<String>,
    last_ticker: Option<Ticker>,
    notifications: usize,
}

/// Prints engine callbacks to stdout and keeps the most recent lines.
pub struct ConsolePresenter {
    state: Mutex<ConsoleState>,
    history: usize,
    echo: bool,
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConsoleState::default()),
            history: DEFAULT_HISTORY,
            echo: true,
        }
    }

    /// Record lines without printing them.
    pub fn quiet() -> Self {
        Self {
            echo: false,
            ..Self::new()
        }
    }

    /// Most recent lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.state.lock().lines.iter().cloned().collect()
    }

    pub fn last_ticker(&self) -> Option<Ticker> {
        self.state.lock().last_ticker
    }

    pub fn notification_count(&self) -> usize {
        self.state.lock().notifications
    }

    fn emit(&self, line: String) {
        if self.echo {
            println!("{}", line);
        }
        let mut state = self.state.lock();
        state.lines.push_back(line);
        while state.lines.len() > self.history {
            state.lines.pop_front();
        }
    }
}

impl Presenter for ConsolePresenter {
    fn on_table_refresh(&self, candles: &[Candle]) {
        self.emit(format!("{} closed candles", candles.len()));
        for candle in candles.iter().rev().take(TABLE_ROWS).rev() {
            self.emit(format_candle_row(candle));
        }
    }

    fn on_chart_update(&self, update: &ChartUpdate) {
        self.emit(format_chart_line(update));
    }

    fn on_status(&self, message: &str, is_success: bool) {
        let marker = if is_success { "ok" } else { "!!" };
        self.emit(format!("[{}] {}", marker, message));
    }

    fn on_notification(&self, message: &str) {
        self.state.lock().notifications += 1;
        self.emit(format!(">>> {}", message.replace('\n', " | ")));
    }

    fn on_ticker(&self, ticker: &Ticker) {
        self.state.lock().last_ticker = Some(*ticker);
        self.emit(format_ticker_line(ticker));
    }
}

fn format_time(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn format_candle_row(candle: &Candle) -> String {
    format!(
        "  {}  O {:.2}  H {:.2}  L {:.2}  C {:.2}  V {:.2}",
        format_time(candle.timestamp),
        candle.open,
        candle.high,
        candle.low,
        candle.close,
        candle.volume
    )
}

fn format_signal(signal: Option<&SignalResult>) -> String {
    signal
        .map(ToString::to_string)
        .unwrap_or_else(|| "no signal".to_string())
}

/// One-line summary of a chart update.
pub fn format_chart_line(update: &ChartUpdate) -> String {
    let mode = if update.is_real_time { "live" } else { "fetch" };
    let mut line = format!(
        "[{}] base {} candles{}, signal {} @ {}",
        mode,
        update.candles.len(),
        if update.in_progress.is_some() { " +1 open" } else { "" },
        format_signal(update.signal.as_ref()),
        update.marker_index
    );
    if !update.htf_candles.is_empty() || update.htf_in_progress.is_some() {
        line.push_str(&format!(
            "; htf {} candles, signal {} @ {}",
            update.htf_candles.len(),
            format_signal(update.htf_signal.as_ref()),
            update.htf_marker_index
        ));
    }
    line
}

/// One-line ticker summary.
pub fn format_ticker_line(ticker: &Ticker) -> String {
    format!(
        "ticker {:.2} (24h {:.2} - {:.2}) at {}",
        ticker.last_price,
        ticker.low_24h,
        ticker.high_24h,
        format_time(ticker.timestamp)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::types::{SignalStrength, SignalType};

    const HOUR: i64 = 3_600_000;

    fn update(htf: bool) -> ChartUpdate {
        ChartUpdate {
            signal: Some(SignalResult::new(SignalType::Buy, SignalStrength::Strong)),
            candles: vec![Candle::new(0, 1.0, 2.0, 0.5, 1.5, 10.0); 3],
            in_progress: Some(Candle::new(3 * HOUR, 1.5, 2.0, 1.0, 1.8, 1.0)),
            is_real_time: true,
            htf_candles: if htf {
                vec![Candle::new(0, 1.0, 2.0, 0.5, 1.5, 40.0)]
            } else {
                Vec::new()
            },
            htf_in_progress: None,
            htf_signal: None,
            marker_index: 2,
            htf_marker_index: -1,
        }
    }

    #[test]
    fn test_chart_line() {
        assert_eq!(
            format_chart_line(&update(false)),
            "[live] base 3 candles +1 open, signal BUY (Strong) @ 2"
        );
        assert!(format_chart_line(&update(true)).ends_with("; htf 1 candles, signal no signal @ -1"));
    }

    #[test]
    fn test_ticker_line() {
        let ticker = Ticker::new(101.5, 95.0, 110.0, 0);
        assert_eq!(
            format_ticker_line(&ticker),
            "ticker 101.50 (24h 95.00 - 110.00) at 1970-01-01 00:00"
        );
    }

    #[test]
    fn test_presenter_records_callbacks() {
        let presenter = ConsolePresenter::quiet();
        presenter.on_status("Processed 3 candles", true);
        presenter.on_status("Error: boom", false);
        presenter.on_notification("BTC/USDT\nBUY (Strong)");
        presenter.on_ticker(&Ticker::new(100.0, 90.0, 110.0, 0));

        let lines = presenter.lines();
        assert_eq!(lines[0], "[ok] Processed 3 candles");
        assert_eq!(lines[1], "[!!] Error: boom");
        assert_eq!(lines[2], ">>> BTC/USDT | BUY (Strong)");
        assert_eq!(presenter.notification_count(), 1);
        assert_eq!(presenter.last_ticker().map(|t| t.last_price), Some(100.0));
    }

    #[test]
    fn test_table_prints_latest_rows() {
        let presenter = ConsolePresenter::quiet();
        let candles: Vec<Candle> = (0..8)
            .map(|i| Candle::new(i * HOUR, 1.0, 2.0, 0.5, 1.5, 1.0))
            .collect();
        presenter.on_table_refresh(&candles);

        let lines = presenter.lines();
        assert_eq!(lines.len(), 1 + TABLE_ROWS);
        assert_eq!(lines[0], "8 closed candles");
        assert!(lines[1].starts_with("  1970-01-01 03:00"));
    }

    #[test]
    fn test_history_is_bounded() {
        let presenter = ConsolePresenter::quiet();
        for i in 0..(DEFAULT_HISTORY + 10) {
            presenter.on_status(&format!("status {}", i), true);
        }
        let lines = presenter.lines();
        assert_eq!(lines.len(), DEFAULT_HISTORY);
        assert_eq!(lines[0], "[ok] status 10");
    }
}
