//! Inline scheduler for deterministic tests

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tollgate_domain::DelayTier;

use crate::dispatch::{DispatchTask, Submission, TaskScheduler};

/// Runs every task on the submitting thread, ignoring delays
///
/// Records the tier of each accepted task so tests can assert on
/// background/foreground scheduling.
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
    tiers: Mutex<Vec<DelayTier>>,
    shut_down: AtomicBool,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tiers of accepted tasks, in submission order.
    pub fn tiers(&self) -> Vec<DelayTier> {
        self.tiers.lock().clone()
    }
}

impl TaskScheduler for ImmediateScheduler {
    fn submit(&self, work: DispatchTask, tier: DelayTier) -> Submission {
        if self.is_shutdown() {
            tracing::debug!(tier = %tier, "dropping task submitted after shutdown");
            return Submission::Rejected;
        }
        self.tiers.lock().push(tier);
        work();
        Submission::Accepted
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    fn is_shutdown(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}
