//! Dispatching: scheduler port, call deduplication and completion handles

pub mod completion;
pub mod dedup;
pub mod outcome;
pub mod ports;

pub use completion::{completion, Completion};
pub use dedup::{CallDeduplicator, Callback, Dispatch};
pub use outcome::{DispatchFailure, DispatchOutcome, FromDispatchFailure};
pub use ports::{DispatchObserver, DispatchTask, NoopObserver, Submission, TaskScheduler};
