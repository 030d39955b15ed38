//! Error types used while setting up and wiring the SDK core
//!
//! Backend call failures are not reported through this type; they travel as
//! [`crate::BackendError`] values through completion callbacks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Tollgate setup and infrastructure operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TollgateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Tollgate operations
pub type Result<T> = std::result::Result<T, TollgateError>;
