//! Port interfaces for dispatching work off the caller's thread

use std::time::Duration;

use tollgate_domain::DelayTier;

/// Unit of work handed to a scheduler
pub type DispatchTask = Box<dyn FnOnce() + Send + 'static>;

/// Whether a scheduler took ownership of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The task will run (after its tier's delay)
    Accepted,
    /// The scheduler is shut down; the task was dropped without running
    Rejected,
}

impl Submission {
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Runs submitted work asynchronously on a bounded pool of workers
///
/// Implementations must never block the submitting thread. After
/// [`TaskScheduler::shutdown`] every submission is dropped and reported as
/// [`Submission::Rejected`]; work accepted earlier still runs.
pub trait TaskScheduler: Send + Sync {
    /// Queue `work` to run once `tier`'s delay has elapsed.
    fn submit(&self, work: DispatchTask, tier: DelayTier) -> Submission;

    /// Stop accepting new work.
    fn shutdown(&self);

    /// Whether [`TaskScheduler::shutdown`] has been called.
    fn is_shutdown(&self) -> bool;
}

/// Hooks for observing request traffic through the gateway
///
/// Every method has a no-op default so adapters implement only what they
/// record.
pub trait DispatchObserver: Send + Sync {
    /// A procedure was called.
    fn on_request(&self, _endpoint: &'static str) {}

    /// A call joined an in-flight request instead of starting its own.
    fn on_coalesced(&self, _endpoint: &'static str) {}

    /// A transport call finished and its result was parsed.
    fn on_completed(&self, _endpoint: &'static str, _elapsed: Duration, _success: bool) {}
}

/// Observer that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}
