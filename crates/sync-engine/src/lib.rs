//! Synchronization engine.
//!
//! - [`RateBudget`]: per-second call budget per operation class
//! - [`AdmissionGate`]: one in-flight call per class, reset under overlap
//! - [`reconcile`]: closed / in-progress candle split
//! - [`SyncEngine`]: OHLCV and ticker cycles, snapshots, recalculation
//! - [`RealTimeScheduler`]: live and backtest polling

pub mod admission;
mod engine;
pub mod messages;
pub mod rate_budget;
mod recalc;
pub mod reconciler;
mod scheduler;
pub mod snapshot;
pub mod state;
pub mod window;

#[cfg(test)]
mod test_support;

pub use admission::{Admission, AdmissionGate, AdmissionPermit};
pub use engine::{CycleOutcome, EngineSettings, FetchResult, SkipReason, SyncEngine, TickerUpdate};
pub use rate_budget::{RateBudget, RateDecision};
pub use recalc::{RecalcRequest, RECALC_LIMIT_RANGE};
pub use reconciler::{current_period_start, patch_close, reconcile, PatchOutcome, Reconciled};
pub use scheduler::{PollIntervals, RealTimeScheduler, SchedulerMode};
pub use snapshot::{Snapshot, SnapshotStore};
pub use state::{LiveState, NotificationTracker, TierState};
