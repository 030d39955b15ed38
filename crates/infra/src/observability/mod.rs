//! Observability infrastructure for dispatch metrics
//!
//! [`metrics::DispatchMetrics`] plugs into the core as a `DispatchObserver`
//! and keeps:
//! - Request, coalesced, network call and failure counters
//! - Per-endpoint network call counts
//! - A ring buffer of the last 1000 call latencies with P50/P95/P99
//!
//! ## Error Handling
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tollgate_infra::observability::metrics::DispatchMetrics;
//!
//! let metrics = DispatchMetrics::new();
//! metrics.record_latency(Duration::from_millis(120));
//!
//! match metrics.p95_latency_ms() {
//!     Ok(p95) => tracing::info!(p95, "dispatch latency"),
//!     Err(e) => tracing::debug!("no latency data yet: {}", e),
//! }
//! ```

pub mod metrics;

pub use metrics::{DispatchMetrics, DispatchSnapshot};

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "P95", "P50")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
