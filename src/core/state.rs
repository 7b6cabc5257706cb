//! State shared between the device reader and the session orchestrator.
//!
//! One mutex guards both the latest-sample slot and the run flag. The
//! condition variable lets protocol waits wake up as soon as a stop is
//! requested instead of sleeping out the full stage.

use crate::device::{ChannelStats, Sample};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct Slot {
    latest: Option<Sample>,
    running: bool,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    stop_requested: Condvar,
    stats: ChannelStats,
}

/// Handle to the latest-sample store and run flag. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Shared>,
}

impl SharedState {
    /// Empty store, run flag raised.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    latest: None,
                    running: true,
                }),
                stop_requested: Condvar::new(),
                stats: ChannelStats::new(),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        // A panicking holder cannot leave the slot half-written; both fields
        // are plain values.
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the stored sample.
    pub fn publish_sample(&self, sample: Sample) {
        self.slot().latest = Some(sample);
    }

    /// Copy of the most recent sample, or `None` if nothing has arrived.
    /// Never blocks waiting for data.
    pub fn latest_sample(&self) -> Option<Sample> {
        self.slot().latest
    }

    /// Forget the stored sample.
    pub fn clear_sample(&self) {
        self.slot().latest = None;
    }

    pub fn is_running(&self) -> bool {
        self.slot().running
    }

    /// Lower the run flag and wake any waiter.
    ///
    /// Returns `true` only for the call that actually lowered it.
    pub fn request_stop(&self) -> bool {
        let mut slot = self.slot();
        let was_running = slot.running;
        slot.running = false;
        drop(slot);
        self.inner.stop_requested.notify_all();
        was_running
    }

    /// Block for `duration` unless a stop is requested first.
    ///
    /// Returns `true` if the full wait elapsed with the flag still raised,
    /// `false` if the run was (or already had been) stopped.
    pub fn wait(&self, duration: Duration) -> bool {
        let slot = self.slot();
        if !slot.running {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        let (slot, _) = self
            .inner
            .stop_requested
            .wait_timeout_while(slot, duration, |slot| slot.running)
            .unwrap_or_else(PoisonError::into_inner);
        slot.running
    }

    /// Reader counters.
    pub fn stats(&self) -> &ChannelStats {
        &self.inner.stats
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
