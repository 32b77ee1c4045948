//! Admission control for overlapping calls.
//!
//! At most one call per [`OperationClass`] is in flight. Calls arriving while
//! one is in flight are counted; once the count reaches the exchange's
//! `max_pending`, the in-flight call is cancelled and the slot cleared so the
//! next cycle starts fresh.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use sync_core::types::OperationClass;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
struct Slot {
    generation: u64,
    pending: u32,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct GateState {
    slots: BTreeMap<OperationClass, Slot>,
    next_generation: u64,
}

/// Result of [`AdmissionGate::try_enter`].
#[derive(Debug)]
pub enum Admission {
    /// The caller owns the slot until the permit is dropped.
    Admitted(AdmissionPermit),
    /// Another call is in flight; skip this cycle.
    InFlight { pending: u32 },
    /// Too many overlapping calls: the in-flight call was cancelled and the
    /// slot cleared. Try again next cycle.
    Reset,
}

/// Per-class in-flight tracking, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    state: Arc<Mutex<GateState>>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start a call of class `op`.
    pub fn try_enter(&self, op: OperationClass, max_pending: u32) -> Admission {
        let mut state = self.state.lock();

        if let Some(slot) = state.slots.get_mut(&op) {
            slot.pending += 1;
            if slot.pending >= max_pending {
                slot.token.cancel();
                debug!(op = %op, pending = slot.pending, "Pending threshold hit, cancelling in-flight call");
                state.slots.remove(&op);
                return Admission::Reset;
            }
            debug!(op = %op, pending = slot.pending, "Call still in flight, skipping");
            return Admission::InFlight {
                pending: slot.pending,
            };
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let token = CancellationToken::new();
        state.slots.insert(
            op,
            Slot {
                generation,
                pending: 1,
                token: token.clone(),
            },
        );
        Admission::Admitted(AdmissionPermit {
            gate: self.state.clone(),
            op,
            generation,
            token,
        })
    }

    /// Whether a call of class `op` is in flight.
    pub fn is_in_flight(&self, op: OperationClass) -> bool {
        self.state.lock().slots.contains_key(&op)
    }

    /// Pending counter of `op` (0 when idle).
    pub fn pending(&self, op: OperationClass) -> u32 {
        self.state.lock().slots.get(&op).map_or(0, |s| s.pending)
    }

    /// Cancel every in-flight call and zero all counters.
    pub fn cancel_all(&self) {
        let mut state = self.state.lock();
        for (op, slot) in std::mem::take(&mut state.slots) {
            debug!(op = %op, "Cancelling in-flight call");
            slot.token.cancel();
        }
    }
}

/// Ownership of an admission slot. Dropping it releases the slot, unless
/// the slot has since been reset and handed to a newer call.
#[derive(Debug)]
pub struct AdmissionPermit {
    gate: Arc<Mutex<GateState>>,
    op: OperationClass,
    generation: u64,
    token: CancellationToken,
}

impl AdmissionPermit {
    /// Cancellation handle passed to the adapter.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn op(&self) -> OperationClass {
        self.op
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        if state
            .slots
            .get(&self.op)
            .is_some_and(|slot| slot.generation == self.generation)
        {
            state.slots.remove(&self.op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted(admission: Admission) -> AdmissionPermit {
        match admission {
            Admission::Admitted(permit) => permit,
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[test]
    fn test_max_pending_overlap_cancels_once() {
        let gate = AdmissionGate::new();
        let first = admitted(gate.try_enter(OperationClass::Ohlcv, 3));

        assert!(matches!(
            gate.try_enter(OperationClass::Ohlcv, 3),
            Admission::InFlight { pending: 2 }
        ));
        assert!(!first.is_cancelled());

        assert!(matches!(gate.try_enter(OperationClass::Ohlcv, 3), Admission::Reset));
        assert!(first.is_cancelled());
        assert_eq!(gate.pending(OperationClass::Ohlcv), 0);
        assert!(!gate.is_in_flight(OperationClass::Ohlcv));

        let second = admitted(gate.try_enter(OperationClass::Ohlcv, 3));
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_slow_exchange_resets_on_second_call() {
        let gate = AdmissionGate::new();
        let first = admitted(gate.try_enter(OperationClass::Ticker, 2));
        assert!(matches!(gate.try_enter(OperationClass::Ticker, 2), Admission::Reset));
        assert!(first.is_cancelled());
    }

    #[test]
    fn test_stale_permit_does_not_release_newer_call() {
        let gate = AdmissionGate::new();
        let stale = admitted(gate.try_enter(OperationClass::Ohlcv, 2));
        assert!(matches!(gate.try_enter(OperationClass::Ohlcv, 2), Admission::Reset));
        let fresh = admitted(gate.try_enter(OperationClass::Ohlcv, 2));

        drop(stale);
        assert!(gate.is_in_flight(OperationClass::Ohlcv));
        drop(fresh);
        assert!(!gate.is_in_flight(OperationClass::Ohlcv));
    }

    #[test]
    fn test_drop_releases_slot() {
        let gate = AdmissionGate::new();
        {
            let _permit = admitted(gate.try_enter(OperationClass::Ohlcv, 3));
            assert_eq!(gate.pending(OperationClass::Ohlcv), 1);
        }
        assert!(!gate.is_in_flight(OperationClass::Ohlcv));
        let _again = admitted(gate.try_enter(OperationClass::Ohlcv, 3));
    }

    #[test]
    fn test_classes_are_independent() {
        let gate = AdmissionGate::new();
        let _ohlcv = admitted(gate.try_enter(OperationClass::Ohlcv, 3));
        let _ticker = admitted(gate.try_enter(OperationClass::Ticker, 3));
    }

    #[test]
    fn test_cancel_all() {
        let gate = AdmissionGate::new();
        let ohlcv = admitted(gate.try_enter(OperationClass::Ohlcv, 3));
        let ticker = admitted(gate.try_enter(OperationClass::Ticker, 3));
        gate.cancel_all();
        assert!(ohlcv.is_cancelled() && ticker.is_cancelled());
        assert_eq!(gate.pending(OperationClass::Ohlcv), 0);
        assert_eq!(gate.pending(OperationClass::Ticker), 0);
    }
}
