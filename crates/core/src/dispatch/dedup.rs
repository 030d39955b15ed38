//! Call deduplication keyed by request fingerprint
//!
//! [`CallDeduplicator`] guarantees at most one underlying operation in flight
//! per [`Fingerprint`]. Callers arriving while an operation runs are parked
//! on its entry and receive a clone of the single outcome, in the order they
//! registered. The entry is removed under the same lock that parks callers,
//! so a request arriving after removal starts a fresh operation.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tollgate_domain::{DelayTier, Fingerprint};
use tracing::{debug, error};

use super::outcome::{panic_message, DispatchFailure, DispatchOutcome};
use super::ports::{DispatchTask, Submission, TaskScheduler};

/// Completion callback parked on an in-flight call
pub type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// What [`CallDeduplicator::perform`] did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A new operation was submitted to the scheduler
    Started,
    /// The callback joined an operation already in flight
    Joined,
    /// The scheduler refused the operation; callbacks already fired
    Rejected,
}

struct InFlightCall<T> {
    callbacks: Vec<Callback<T>>,
    created: Instant,
}

type CallTable<T> = Mutex<HashMap<Fingerprint, InFlightCall<T>>>;

/// Coalesces concurrent identical requests into one operation
pub struct CallDeduplicator<T: DispatchOutcome> {
    calls: Arc<CallTable<T>>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl<T: DispatchOutcome> CallDeduplicator<T> {
    pub fn new(scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self { calls: Arc::new(Mutex::new(HashMap::new())), scheduler }
    }

    /// Run `operation` for `fingerprint` unless an identical call is in flight.
    ///
    /// Background callers are scheduled on [`DelayTier::Default`], foreground
    /// callers on [`DelayTier::None`]. A caller that joins an existing call
    /// inherits that call's tier.
    pub fn perform<Op, Cb>(
        &self,
        fingerprint: Fingerprint,
        is_background: bool,
        operation: Op,
        on_done: Cb,
    ) -> Dispatch
    where
        Op: FnOnce() -> T + Send + 'static,
        Cb: FnOnce(T) + Send + 'static,
    {
        self.perform_with_tier(fingerprint, DelayTier::for_background(is_background), operation, on_done)
    }

    /// [`CallDeduplicator::perform`] with an explicit delay tier.
    pub fn perform_with_tier<Op, Cb>(
        &self,
        fingerprint: Fingerprint,
        tier: DelayTier,
        operation: Op,
        on_done: Cb,
    ) -> Dispatch
    where
        Op: FnOnce() -> T + Send + 'static,
        Cb: FnOnce(T) + Send + 'static,
    {
        {
            let mut calls = self.calls.lock();
            if let Some(call) = calls.get_mut(&fingerprint) {
                call.callbacks.push(Box::new(on_done));
                debug!(
                    fingerprint = %fingerprint,
                    waiting = call.callbacks.len(),
                    "joined in-flight call"
                );
                return Dispatch::Joined;
            }
            calls.insert(
                fingerprint.clone(),
                InFlightCall { callbacks: vec![Box::new(on_done)], created: Instant::now() },
            );
        }

        // Submitted outside the lock: an inline scheduler completes the call
        // (and takes the lock again) before `submit` returns.
        let completer = Completer::new(Arc::clone(&self.calls), fingerprint.clone());
        let task: DispatchTask = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(operation)) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(fingerprint = %completer.fingerprint, panic = %message, "dispatched operation panicked");
                    T::from_dispatch_failure(DispatchFailure::Panicked(message))
                }
            };
            completer.finish(outcome);
        });

        match self.scheduler.submit(task, tier) {
            Submission::Accepted => {
                debug!(fingerprint = %fingerprint, tier = %tier, "started call");
                Dispatch::Started
            }
            Submission::Rejected => {
                debug!(fingerprint = %fingerprint, "scheduler rejected call");
                Dispatch::Rejected
            }
        }
    }

    /// Number of fingerprints with an operation in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_in_flight(&self, fingerprint: &Fingerprint) -> bool {
        self.calls.lock().contains_key(fingerprint)
    }
}

/// Drains a fingerprint's callbacks exactly once
///
/// Dropping a completer that never finished (the scheduler discarded its
/// task) resolves the waiters with [`DispatchFailure::Rejected`].
struct Completer<T: DispatchOutcome> {
    calls: Arc<CallTable<T>>,
    fingerprint: Fingerprint,
    finished: bool,
}

impl<T: DispatchOutcome> Completer<T> {
    const fn new(calls: Arc<CallTable<T>>, fingerprint: Fingerprint) -> Self {
        Self { calls, fingerprint, finished: false }
    }

    fn finish(mut self, outcome: T) {
        self.finished = true;
        self.drain(outcome);
    }

    fn drain(&self, outcome: T) {
        let Some(call) = self.calls.lock().remove(&self.fingerprint) else {
            return;
        };
        debug!(
            fingerprint = %self.fingerprint,
            callbacks = call.callbacks.len(),
            elapsed_ms = call.created.elapsed().as_millis() as u64,
            "completing call"
        );
        for callback in call.callbacks {
            let value = outcome.clone();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || callback(value))) {
                error!(
                    fingerprint = %self.fingerprint,
                    panic = %panic_message(payload.as_ref()),
                    "completion callback panicked"
                );
            }
        }
    }
}

impl<T: DispatchOutcome> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.drain(T::from_dispatch_failure(DispatchFailure::Rejected));
        }
    }
}
