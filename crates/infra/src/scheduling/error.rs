//! Scheduler error types

use thiserror::Error;
use tollgate_domain::TollgateError;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler settings are unusable
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// The dedicated runtime could not be created
    #[error("Failed to create scheduler runtime: {0}")]
    RuntimeBuildFailed(String),

    /// Operation timed out
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let domain_err = match err {
            SchedulerError::InvalidConfig(_) => TollgateError::Config(err.to_string()),
            SchedulerError::RuntimeBuildFailed(_) | SchedulerError::Timeout { .. } => {
                TollgateError::Internal(err.to_string())
            }
        };
        InfraError(domain_err)
    }
}

impl From<SchedulerError> for TollgateError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_maps_to_config_error() {
        let err: TollgateError = SchedulerError::InvalidConfig("workers must be at least 1".into()).into();
        assert!(matches!(err, TollgateError::Config(msg) if msg.contains("workers")));
    }

    #[test]
    fn timeout_maps_to_internal_error() {
        let err: TollgateError = SchedulerError::Timeout { millis: 250 }.into();
        assert!(matches!(err, TollgateError::Internal(msg) if msg.contains("250ms")));
    }
}
