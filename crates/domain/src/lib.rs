//! # Tollgate Domain
//!
//! Data types shared by every Tollgate crate.
//!
//! This crate contains:
//! - Endpoint descriptors and request fingerprints
//! - Delay tiers and per-call dispatch states
//! - Transport request/result contracts
//! - The typed backend error taxonomy and handling directives
//! - Response payload shapes and request bodies
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other Tollgate crates
//! - Only external dependencies allowed
//! - Pure data and deterministic helpers, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
