//! # Tollgate Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The blocking reqwest transport with fallback hosts
//! - The tokio-backed dispatch scheduler with delay tiers
//! - Configuration loading (environment, JSON, TOML)
//! - Logging initialisation and dispatch metrics
//! - [`TollgateClient`], which wires all of the above to a core `Backend`
//!
//! ## Architecture
//! - Implements traits defined in `tollgate-core`
//! - Depends on `tollgate-domain` and `tollgate-core`
//! - Contains all "impure" code (I/O, threads, environment)

pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use client::TollgateClient;
pub use errors::InfraError;
pub use http::ReqwestTransport;
pub use observability::DispatchMetrics;
pub use scheduling::{DispatchScheduler, DispatchSchedulerConfig};
