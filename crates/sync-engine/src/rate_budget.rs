//! Per-second call budget per operation class.

use std::collections::BTreeMap;
use std::time::Duration;
use sync_core::types::OperationClass;

const WINDOW_MS: i64 = 1000;
const DEFAULT_LIMIT: u32 = 5;

/// Outcome of [`RateBudget::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admitted,
    /// Budget spent; retry after `wait` (window rollover plus slack).
    Denied { wait: Duration },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted)
    }
}

#[derive(Debug, Clone)]
struct RateWindow {
    window_start: i64,
    count: u32,
    limit_per_second: u32,
}

impl RateWindow {
    fn new(limit_per_second: u32) -> Self {
        Self {
            window_start: i64::MIN,
            count: 0,
            limit_per_second,
        }
    }
}

/// Fixed one-second windows, one per [`OperationClass`].
#[derive(Debug, Clone)]
pub struct RateBudget {
    windows: BTreeMap<OperationClass, RateWindow>,
    slack_ms: i64,
}

impl RateBudget {
    /// Budget whose denials add `slack` to the computed wait.
    pub fn new(slack: Duration) -> Self {
        let windows = OperationClass::all()
            .into_iter()
            .map(|op| (op, RateWindow::new(DEFAULT_LIMIT)))
            .collect();
        Self {
            windows,
            slack_ms: i64::try_from(slack.as_millis()).unwrap_or(0),
        }
    }

    /// Set the calls allowed per second for `op`. Zero is treated as one.
    pub fn set_limit(&mut self, op: OperationClass, limit_per_second: u32) {
        self.window_mut(op).limit_per_second = limit_per_second.max(1);
    }

    pub fn limit(&self, op: OperationClass) -> u32 {
        self.windows
            .get(&op)
            .map_or(DEFAULT_LIMIT, |w| w.limit_per_second)
    }

    /// Calls admitted in the current window.
    pub fn used(&self, op: OperationClass) -> u32 {
        self.windows.get(&op).map_or(0, |w| w.count)
    }

    /// Count a call at `now_ms` against `op`'s window.
    pub fn admit(&mut self, op: OperationClass, now_ms: i64) -> RateDecision {
        let slack_ms = self.slack_ms;
        let window = self.window_mut(op);

        if window.window_start == i64::MIN || now_ms - window.window_start >= WINDOW_MS {
            window.window_start = now_ms;
            window.count = 0;
        }

        if window.count >= window.limit_per_second {
            let elapsed = now_ms - window.window_start;
            let wait_ms = (WINDOW_MS - elapsed).max(0) + slack_ms;
            return RateDecision::Denied {
                wait: Duration::from_millis(wait_ms as u64),
            };
        }

        window.count += 1;
        RateDecision::Admitted
    }

    /// Forget all windows, keeping the limits.
    pub fn reset(&mut self) {
        for window in self.windows.values_mut() {
            window.window_start = i64::MIN;
            window.count = 0;
        }
    }

    fn window_mut(&mut self, op: OperationClass) -> &mut RateWindow {
        self.windows
            .entry(op)
            .or_insert_with(|| RateWindow::new(DEFAULT_LIMIT))
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}
