//! # Tollgate Core
//!
//! Dispatch logic for the subscription backend client. No I/O of its own.
//!
//! This crate contains:
//! - Port interfaces ([`TaskScheduler`], [`Transport`], [`DispatchObserver`])
//! - The [`CallDeduplicator`] that coalesces identical in-flight requests
//! - The [`ErrorClassifier`] and per-endpoint handling directives
//! - The [`Backend`] endpoint gateway
//!
//! ## Architecture Principles
//! - Only depends on `tollgate-domain`
//! - No HTTP client, runtime or platform code
//! - All external collaborators via traits

pub mod classifier;
pub mod dispatch;
pub mod gateway;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use classifier::{Directive, EndpointError, ErrorClassifier, FailureCategory};
pub use dispatch::{
    completion, CallDeduplicator, Completion, Dispatch, DispatchFailure, DispatchObserver,
    DispatchOutcome, DispatchTask, FromDispatchFailure, NoopObserver, Submission, TaskScheduler,
};
pub use gateway::{Backend, Transport};
