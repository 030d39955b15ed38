//! Tokio-backed worker pool with delay tiers.
//!
//! # Example
//!
//! ```no_run
//! use tollgate_core::TaskScheduler;
//! use tollgate_domain::{DelayTier, DispatchConfig};
//! use tollgate_infra::scheduling::{DispatchScheduler, DispatchSchedulerConfig};
//!
//! # fn example() -> tollgate_infra::scheduling::SchedulerResult<()> {
//! let scheduler = DispatchScheduler::new(DispatchSchedulerConfig::api(&DispatchConfig::default()))?;
//! scheduler.submit(Box::new(|| println!("hello from a worker")), DelayTier::None);
//! scheduler.shutdown();
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use tokio::runtime::{Builder as RuntimeBuilder, Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tollgate_core::{DispatchTask, Submission, TaskScheduler};
use tollgate_domain::{DelayPolicy, DelayTier, DispatchConfig};
use tracing::{debug, error, info, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Configuration for one scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSchedulerConfig {
    /// Label used for thread names and log fields.
    pub name: String,
    /// Upper bound on concurrently running tasks.
    pub workers: usize,
    /// Delay window for [`DelayTier::Default`].
    pub default_delay: DelayPolicy,
    /// Delay window for [`DelayTier::Long`].
    pub long_delay: DelayPolicy,
}

impl DispatchSchedulerConfig {
    /// Pool serving ordinary API traffic.
    pub fn api(config: &DispatchConfig) -> Self {
        Self {
            name: "api".into(),
            workers: config.api_workers,
            default_delay: config.default_delay,
            long_delay: config.long_delay,
        }
    }

    /// Pool serving diagnostics and paywall events.
    pub fn telemetry(config: &DispatchConfig) -> Self {
        Self {
            name: "telemetry".into(),
            workers: config.telemetry_workers,
            default_delay: config.default_delay,
            long_delay: config.long_delay,
        }
    }

    fn validate(&self) -> SchedulerResult<()> {
        if self.workers == 0 {
            return Err(SchedulerError::InvalidConfig(format!(
                "{}: workers must be at least 1",
                self.name
            )));
        }
        for (tier, policy) in [("default_delay", self.default_delay), ("long_delay", self.long_delay)] {
            if policy.min_ms > policy.max_ms {
                return Err(SchedulerError::InvalidConfig(format!(
                    "{}: {tier} min_ms exceeds max_ms",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Bounded background worker pool implementing [`TaskScheduler`].
pub struct DispatchScheduler {
    name: String,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    cancellation: CancellationToken,
    pending: Arc<AtomicUsize>,
    default_delay: DelayPolicy,
    long_delay: DelayPolicy,
}

impl DispatchScheduler {
    /// Create a scheduler with its own runtime.
    pub fn new(config: DispatchSchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;

        let runtime = RuntimeBuilder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.workers)
            .thread_name(format!("tollgate-{}", config.name))
            .enable_time()
            .build()
            .map_err(|err| SchedulerError::RuntimeBuildFailed(err.to_string()))?;

        info!(scheduler = %config.name, workers = config.workers, "dispatch scheduler started");

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            name: config.name,
            cancellation: CancellationToken::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            default_delay: config.default_delay,
            long_delay: config.long_delay,
        })
    }

    /// Accepted tasks that have not finished yet, including delayed ones.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Block the calling thread until every accepted task finished.
    ///
    /// Must not be called from one of this scheduler's own tasks.
    pub fn wait_idle(&self, timeout: Duration) -> SchedulerResult<()> {
        let started = Instant::now();
        while self.pending() > 0 {
            if started.elapsed() >= timeout {
                return Err(SchedulerError::Timeout {
                    millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
        Ok(())
    }

    fn delay_for(&self, tier: DelayTier) -> Duration {
        match tier {
            DelayTier::None => Duration::ZERO,
            DelayTier::Default => sample_delay(self.default_delay),
            DelayTier::Long => sample_delay(self.long_delay),
        }
    }
}

impl TaskScheduler for DispatchScheduler {
    fn submit(&self, work: DispatchTask, tier: DelayTier) -> Submission {
        if self.cancellation.is_cancelled() {
            debug!(scheduler = %self.name, tier = %tier, "scheduler shut down; dropping task");
            return Submission::Rejected;
        }

        let delay = self.delay_for(tier);
        let guard = PendingGuard::new(Arc::clone(&self.pending));
        let name = self.name.clone();
        debug!(scheduler = %name, tier = %tier, delay_ms = delay.as_millis(), "task accepted");

        self.handle.spawn(async move {
            let _guard = guard;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(err) = tokio::task::spawn_blocking(work).await {
                if err.is_panic() {
                    error!(scheduler = %name, "dispatched task panicked");
                } else {
                    warn!(scheduler = %name, error = %err, "dispatched task was cancelled");
                }
            }
        });

        Submission::Accepted
    }

    fn shutdown(&self) {
        if self.cancellation.is_cancelled() {
            return;
        }
        self.cancellation.cancel();
        info!(scheduler = %self.name, pending = self.pending(), "dispatch scheduler shut down");
    }

    fn is_shutdown(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Drop for DispatchScheduler {
    fn drop(&mut self) {
        let pending = self.pending();
        if pending > 0 {
            warn!(
                scheduler = %self.name,
                pending,
                "DispatchScheduler dropped with pending tasks; they will be abandoned"
            );
        }
        self.cancellation.cancel();
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }
}

/// Decrements the pending counter when the task finishes or is dropped unrun.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn sample_delay(policy: DelayPolicy) -> Duration {
    if policy.max_ms == 0 {
        return Duration::ZERO;
    }
    let millis = rand::thread_rng().gen_range(policy.min_ms..=policy.max_ms);
    Duration::from_millis(millis)
}
