//! Transport gateway contract types
//!
//! The transport itself (TLS, pooling, socket retries) is an external
//! collaborator. These types are the request it receives and the result it
//! hands back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::impl_tag_conversions;
use crate::types::endpoint::Endpoint;

/// Ordered `(field, value)` pairs whose order the request signer depends on
pub type FieldsToSign = Vec<(String, String)>;

/// One HTTP request as handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub base_url: String,
    pub endpoint: Endpoint,
    pub body: Option<Map<String, Value>>,
    pub fields_to_sign: Option<FieldsToSign>,
    pub headers: BTreeMap<String, String>,
    pub fallback_base_urls: Vec<String>,
}

impl TransportRequest {
    /// Full URL against the primary base URL.
    pub fn url(&self) -> String {
        join_url(&self.base_url, &self.endpoint.path())
    }
}

/// Join a base URL and an absolute endpoint path without doubling slashes.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Which server produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    #[default]
    MainServer,
    LoadShedder,
    FallbackHost,
}

impl_tag_conversions!(ResponseOrigin {
    MainServer => "main_server",
    LoadShedder => "load_shedder",
    FallbackHost => "fallback_host",
});

/// Outcome of response signature verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationResult {
    NotRequested,
    Verified,
    Failed,
    VerifiedOnDevice,
}

impl_tag_conversions!(VerificationResult {
    NotRequested => "not_requested",
    Verified => "verified",
    Failed => "failed",
    VerifiedOnDevice => "verified_on_device",
});

/// Raw response from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResult {
    pub status: u16,
    pub body: String,
    pub origin: ResponseOrigin,
    pub verification: Option<VerificationResult>,
}

impl TransportResult {
    /// Plain main-server response without verification info.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            origin: ResponseOrigin::MainServer,
            verification: None,
        }
    }

    #[must_use]
    pub const fn with_origin(mut self, origin: ResponseOrigin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub const fn with_verification(mut self, verification: VerificationResult) -> Self {
        self.verification = Some(verification);
        self
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }
}

/// Failure raised by the transport before a response was obtained
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connectivity, DNS, TLS handshake or timeout failure
    #[error("network failure: {0}")]
    Network(String),

    /// The host environment refused the request (sandbox, missing entitlement)
    #[error("permission denied: {0}")]
    Permission(String),
}
