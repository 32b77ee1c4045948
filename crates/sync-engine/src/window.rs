//! Fetch windows and signal marker positions.

/// A `[start, end)` fetch window in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: i64,
    pub end: i64,
}

fn ceil_to(now_ms: i64, step_ms: i64) -> i64 {
    if step_ms <= 0 {
        return now_ms;
    }
    let floor = now_ms.div_euclid(step_ms) * step_ms;
    if floor == now_ms {
        floor
    } else {
        floor + step_ms
    }
}

/// Base window of a fetch.
///
/// An explicit window is used as given. Otherwise the window ends one step
/// past the next period boundary and reaches back `limit` periods. Both
/// forms then extend the end by one period so the in-progress candle is
/// included.
pub fn base_window(
    explicit: Option<(i64, i64)>,
    granularity_ms: i64,
    limit: u32,
    now_ms: i64,
) -> FetchWindow {
    let (start, end) = explicit.unwrap_or_else(|| {
        let end = ceil_to(now_ms, granularity_ms) + granularity_ms;
        (end - granularity_ms * i64::from(limit), end)
    });
    FetchWindow {
        start,
        end: end + granularity_ms,
    }
}

/// HTF window: `htf_limit + 1` higher periods ending one step past the next
/// higher boundary.
pub fn htf_window(htf_ms: i64, htf_limit: u32, now_ms: i64) -> FetchWindow {
    let end = ceil_to(now_ms, htf_ms) + htf_ms;
    FetchWindow {
        start: end - htf_ms * (i64::from(htf_limit) + 1),
        end,
    }
}

/// Index of the candle a signal is anchored to, within all candles of a tier
/// (closed plus in-progress).
///
/// The newest closed candle normally; the in-progress candle when it was part
/// of the signal input. Short candidate lists fall back to their own last
/// index, and an empty tier yields -1.
pub fn marker_index(
    all_len: usize,
    has_in_progress: bool,
    with_latest: bool,
    candidates_len: usize,
) -> i64 {
    let all = all_len as i64;
    let idx = if with_latest || !has_in_progress {
        all - 1
    } else {
        all - 2
    };
    if idx < 0 || candidates_len < 2 {
        (candidates_len as i64 - 1).max(-1)
    } else {
        idx
    }
}
