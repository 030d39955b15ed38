//! Outcomes produced when a dispatched operation never returns normally

use thiserror::Error;
use tollgate_domain::BackendError;

/// Reason a deduplicated call completed without running its operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchFailure {
    /// The scheduler refused or dropped the task
    #[error("dispatcher shut down")]
    Rejected,

    /// The operation panicked
    #[error("operation panicked: {0}")]
    Panicked(String),

    /// The completion callback was dropped without being called
    #[error("completion callback dropped before firing")]
    Abandoned,
}

/// Error types that can stand in for a dispatch failure
pub trait FromDispatchFailure {
    fn from_dispatch_failure(failure: DispatchFailure) -> Self;
}

impl FromDispatchFailure for BackendError {
    fn from_dispatch_failure(failure: DispatchFailure) -> Self {
        Self::unknown(failure.to_string())
    }
}

/// Value a deduplicated call fans out to every waiting callback
pub trait DispatchOutcome: Clone + Send + 'static {
    fn from_dispatch_failure(failure: DispatchFailure) -> Self;
}

impl<T, E> DispatchOutcome for Result<T, E>
where
    T: Clone + Send + 'static,
    E: FromDispatchFailure + Clone + Send + 'static,
{
    fn from_dispatch_failure(failure: DispatchFailure) -> Self {
        Err(E::from_dispatch_failure(failure))
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
