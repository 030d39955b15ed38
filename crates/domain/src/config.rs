//! Configuration structures
//!
//! Everything here is plain serde data. Loading from the environment or from
//! disk lives in `tollgate-infra::config`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_WORKERS, DEFAULT_BASE_URL, DEFAULT_DELAY_MAX_MS, DEFAULT_DELAY_MIN_MS,
    DEFAULT_LOAD_SHEDDER_HEADER, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TELEMETRY_WORKERS,
    LONG_DELAY_MAX_MS, LONG_DELAY_MIN_MS,
};
use crate::{Result, TollgateError};

/// Top-level SDK configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Build a configuration with defaults for everything but the API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::new(api_key),
            dispatch: DispatchConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    /// Returns `TollgateError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.dispatch.validate()?;
        self.transport.validate()
    }
}

/// Backend endpoint and credential settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub fallback_base_urls: Vec<String>,
    #[serde(default)]
    pub platform: PlatformInfo,
    /// Whether purchases are made against a sandbox store
    #[serde(default)]
    pub is_sandbox: bool,
}

impl BackendConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            fallback_base_urls: Vec::new(),
            platform: PlatformInfo::default(),
            is_sandbox: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TollgateError::Config("api_key must not be empty".into()));
        }
        validate_http_url("base_url", &self.base_url)?;
        for fallback in &self.fallback_base_urls {
            validate_http_url("fallback_base_urls", fallback)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("fallback_base_urls", &self.fallback_base_urls)
            .field("platform", &self.platform)
            .field("is_sandbox", &self.is_sandbox)
            .finish()
    }
}

/// Platform identification sent with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub flavor: String,
    pub version: String,
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self { flavor: "native".into(), version: std::env::consts::OS.into() }
    }
}

/// Scheduler pool sizes and background delay policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_api_workers")]
    pub api_workers: usize,
    #[serde(default = "default_telemetry_workers")]
    pub telemetry_workers: usize,
    #[serde(default = "DelayPolicy::default_tier")]
    pub default_delay: DelayPolicy,
    #[serde(default = "DelayPolicy::long_tier")]
    pub long_delay: DelayPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_workers: DEFAULT_API_WORKERS,
            telemetry_workers: DEFAULT_TELEMETRY_WORKERS,
            default_delay: DelayPolicy::default_tier(),
            long_delay: DelayPolicy::long_tier(),
        }
    }
}

impl DispatchConfig {
    fn validate(&self) -> Result<()> {
        if self.api_workers == 0 {
            return Err(TollgateError::Config("api_workers must be at least 1".into()));
        }
        if self.telemetry_workers == 0 {
            return Err(TollgateError::Config("telemetry_workers must be at least 1".into()));
        }
        self.default_delay.validate("default_delay")?;
        self.long_delay.validate("long_delay")
    }
}

/// Bounded delay window for one delay tier, in milliseconds.
///
/// A scheduler picks a duration uniformly inside `[min_ms, max_ms]`. Setting
/// both bounds to the same value yields a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayPolicy {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayPolicy {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        Self { min_ms: ms, max_ms: ms }
    }

    pub const fn immediate() -> Self {
        Self::fixed(0)
    }

    pub const fn default_tier() -> Self {
        Self::new(DEFAULT_DELAY_MIN_MS, DEFAULT_DELAY_MAX_MS)
    }

    pub const fn long_tier() -> Self {
        Self::new(LONG_DELAY_MIN_MS, LONG_DELAY_MAX_MS)
    }

    pub const fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub const fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub const fn is_immediate(&self) -> bool {
        self.max_ms == 0
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(TollgateError::Config(format!(
                "{field}: min_ms ({}) exceeds max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Transport adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_load_shedder_header")]
    pub load_shedder_header: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            load_shedder_header: default_load_shedder_header(),
        }
    }
}

impl TransportConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(TollgateError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        if trimmed.split("://").nth(1).is_some_and(|host| !host.is_empty()) {
            return Ok(());
        }
    }
    Err(TollgateError::Config(format!("{field}: '{value}' is not an http(s) URL")))
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_api_workers() -> usize {
    DEFAULT_API_WORKERS
}

const fn default_telemetry_workers() -> usize {
    DEFAULT_TELEMETRY_WORKERS
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_load_shedder_header() -> String {
    DEFAULT_LOAD_SHEDDER_HEADER.to_string()
}
