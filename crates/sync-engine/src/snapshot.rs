//! In-memory snapshots of successful fetches and recalculations.
//!
//! `initial` is written after every successful OHLCV fetch, `recent` after
//! every successful recalculation. Each write replaces the previous snapshot
//! of its kind wholesale; both live until [`SnapshotStore::reset`].

use crate::state::TierState;
use serde::{Deserialize, Serialize};
use sync_core::error::SnapshotError;
use sync_core::types::FetchRequest;

/// Deep copy of one successful operation's working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub request: FetchRequest,
    pub base: TierState,
    pub htf: Option<TierState>,
    /// Oldest and newest base timestamps
    pub base_bounds: Option<(i64, i64)>,
    /// Oldest and newest HTF timestamps
    pub htf_bounds: Option<(i64, i64)>,
    /// Wall clock at capture (Unix ms)
    pub taken_at: i64,
}

impl Snapshot {
    pub fn new(request: FetchRequest, base: TierState, htf: Option<TierState>, taken_at: i64) -> Self {
        let base_bounds = base.time_bounds();
        let htf_bounds = htf.as_ref().and_then(TierState::time_bounds);
        Self {
            request,
            base,
            htf,
            base_bounds,
            htf_bounds,
            taken_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

/// Holder of the `initial` and `recent` snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    initial: Option<Snapshot>,
    recent: Option<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_initial(&mut self, snapshot: Snapshot) {
        self.initial = Some(snapshot);
    }

    pub fn record_recent(&mut self, snapshot: Snapshot) {
        self.recent = Some(snapshot);
    }

    /// The initial snapshot, if it holds any candles.
    pub fn initial(&self) -> Result<&Snapshot, SnapshotError> {
        self.initial
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(SnapshotError::NoInitialData)
    }

    /// The recent snapshot, if it holds any candles.
    pub fn recent(&self) -> Result<&Snapshot, SnapshotError> {
        self.recent
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(SnapshotError::NoRecentData)
    }

    pub fn has_initial(&self) -> bool {
        self.initial().is_ok()
    }

    pub fn reset(&mut self) {
        self.initial = None;
        self.recent = None;
    }
}
