//! Dispatch metrics for tracking backend call patterns and timing
//!
//! ## Design
//! - **VecDeque ring buffer** of the last 1000 latencies
//! - **parking_lot mutexes** so recording never deals with poisoning
//! - **SeqCst ordering** for counters read together in snapshots

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tollgate_core::DispatchObserver;
use tracing::trace;

use crate::observability::{MetricsError, MetricsResult};

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Counters and latency samples for one client instance
#[derive(Debug)]
pub struct DispatchMetrics {
    requests: AtomicUsize,
    coalesced: AtomicUsize,
    network_calls: AtomicUsize,
    failures: AtomicUsize,
    calls_by_endpoint: Mutex<HashMap<&'static str, usize>>,
    latencies_ms: Mutex<VecDeque<u64>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSnapshot {
    pub requests: usize,
    pub coalesced: usize,
    pub network_calls: usize,
    pub failures: usize,
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            requests: AtomicUsize::new(0),
            coalesced: AtomicUsize::new(0),
            network_calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            calls_by_endpoint: Mutex::new(HashMap::new()),
            latencies_ms: Mutex::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES)),
        }
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            requests: self.requests.load(Ordering::SeqCst),
            coalesced: self.coalesced.load(Ordering::SeqCst),
            network_calls: self.network_calls.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        }
    }

    /// Network calls made for one endpoint name.
    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls_by_endpoint.lock().get(endpoint).copied().unwrap_or(0)
    }

    /// Store a latency sample, evicting the oldest beyond 1000.
    pub fn record_latency(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let mut samples = self.latencies_ms.lock();
        samples.push_back(ms);
        if samples.len() > MAX_LATENCY_SAMPLES {
            samples.pop_front();
        }
    }

    pub fn sample_count(&self) -> usize {
        self.latencies_ms.lock().len()
    }

    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn p50_latency_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.50, "P50")
    }

    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn p95_latency_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.95, "P95")
    }

    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn p99_latency_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.99, "P99")
    }

    /// Nearest-rank percentile over a sorted copy of the ring buffer.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn percentile(&self, percentile: f64, metric: &'static str) -> MetricsResult<u64> {
        let mut sorted: Vec<u64> = self.latencies_ms.lock().iter().copied().collect();
        if sorted.is_empty() {
            return Err(MetricsError::EmptyData { metric });
        }
        sorted.sort_unstable();
        let index = ((sorted.len() as f64 * percentile) as usize).min(sorted.len() - 1);
        Ok(sorted[index])
    }
}

impl DispatchObserver for DispatchMetrics {
    fn on_request(&self, endpoint: &'static str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        trace!(endpoint, "request recorded");
    }

    fn on_coalesced(&self, endpoint: &'static str) {
        self.coalesced.fetch_add(1, Ordering::SeqCst);
        trace!(endpoint, "coalesced request recorded");
    }

    fn on_completed(&self, endpoint: &'static str, elapsed: Duration, success: bool) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        *self.calls_by_endpoint.lock().entry(endpoint).or_insert(0) += 1;
        self.record_latency(elapsed);
    }
}
