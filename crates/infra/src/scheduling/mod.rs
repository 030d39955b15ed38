//! Scheduling infrastructure for dispatched backend calls
//!
//! [`DispatchScheduler`] is the production implementation of the core
//! `TaskScheduler` port. Each instance owns its own tokio runtime, so the
//! API and telemetry pools never compete for workers.
//!
//! Lifecycle rules:
//! - `shutdown()` only stops new work; accepted tasks still run
//! - Dropping the scheduler tears its runtime down in the background
//! - Panicking work is contained and logged

pub mod dispatch_scheduler;
pub mod error;

pub use dispatch_scheduler::{DispatchScheduler, DispatchSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
