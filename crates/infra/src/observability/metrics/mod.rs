//! Metrics collection modules

pub mod dispatch;

pub use dispatch::{DispatchMetrics, DispatchSnapshot};
