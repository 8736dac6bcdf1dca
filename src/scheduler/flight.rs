//! Single-flight guard: at most one probe in flight at any instant.
//!
//! The first caller starts the cycle and parks a shared handle to it in the
//! slot. Callers arriving while it runs await that same handle and get the
//! same outcome, so an overlapping tick and manual refresh produce one probe
//! and one record. The cycle clears the slot itself once its outcome is
//! recorded.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::probes::HealthCheckOutcome;

pub(crate) type SharedOutcome = Shared<BoxFuture<'static, HealthCheckOutcome>>;

#[derive(Default)]
pub(crate) struct SingleFlight {
    slot: Arc<Mutex<Option<SharedOutcome>>>,
}

/// Handed to the cycle so it can release the guard when it is done.
pub(crate) struct FlightRelease {
    slot: Arc<Mutex<Option<SharedOutcome>>>,
}

impl FlightRelease {
    pub(crate) fn release(self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SingleFlight {
    /// Join the in-flight cycle, or start one with `start`. The boolean is
    /// true when this call started the cycle.
    pub(crate) fn join_or_start<F>(&self, start: F) -> (SharedOutcome, bool)
    where
        F: FnOnce(FlightRelease) -> BoxFuture<'static, HealthCheckOutcome>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(in_flight) = slot.as_ref() {
            return (in_flight.clone(), false);
        }

        let release = FlightRelease {
            slot: Arc::clone(&self.slot),
        };
        let cycle = start(release).shared();
        *slot = Some(cycle.clone());
        (cycle, true)
    }

    pub(crate) fn in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
