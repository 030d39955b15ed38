//! Scripted transport for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tollgate_domain::{TransportError, TransportRequest, TransportResult};

use crate::gateway::Transport;

/// Transport that answers from a table keyed by endpoint path
///
/// Every request is recorded. Paths without a scripted reply fail with a
/// network error. An optional latency is applied to every call by sleeping
/// the worker thread.
///
/// ```
/// # #[cfg(feature = "test-utils")]
/// # {
/// use tollgate_core::testing::MockTransport;
///
/// let transport = MockTransport::new();
/// transport.respond("/subscribers/user-1", 200, r#"{"subscriber": {}}"#);
/// assert_eq!(transport.call_count(), 0);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

#[derive(Debug, Clone)]
enum Reply {
    Response(TransportResult),
    Failure(TransportError),
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// Answer requests for `path` with `status` and `body`.
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.respond_with(path, TransportResult::new(status, body));
    }

    /// Answer requests for `path` with a fully specified result.
    pub fn respond_with(&self, path: &str, result: TransportResult) {
        self.replies.lock().insert(path.to_string(), Reply::Response(result));
    }

    pub fn fail_network(&self, path: &str, message: &str) {
        self.replies
            .lock()
            .insert(path.to_string(), Reply::Failure(TransportError::Network(message.into())));
    }

    pub fn fail_permission(&self, path: &str, message: &str) {
        self.replies
            .lock()
            .insert(path.to_string(), Reply::Failure(TransportError::Permission(message.into())));
    }

    /// Every request performed so far, oldest first.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of requests whose endpoint path equals `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|request| request.endpoint.path() == path).count()
    }
}

impl Transport for MockTransport {
    fn perform_request(&self, request: &TransportRequest) -> Result<TransportResult, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }

        let path = request.endpoint.path();
        match self.replies.lock().get(&path).cloned() {
            Some(Reply::Response(result)) => Ok(result),
            Some(Reply::Failure(error)) => Err(error),
            None => Err(TransportError::Network(format!("no response scripted for {path}"))),
        }
    }
}
