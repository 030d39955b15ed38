//! Port interface for the HTTP transport

use tollgate_domain::{TransportError, TransportRequest, TransportResult};

/// Synchronous "perform HTTP request" collaborator
///
/// Called from scheduler workers, never from the caller's thread.
/// Implementations own TLS, pooling, fallback hosts and request signing.
pub trait Transport: Send + Sync {
    fn perform_request(&self, request: &TransportRequest) -> Result<TransportResult, TransportError>;
}
