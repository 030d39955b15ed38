//! SDK constants
//!
//! Centralized location for wire-level names and default tunables.

// Backend
pub const DEFAULT_BASE_URL: &str = "https://api.tollgate.dev/v1";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

// Request headers
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_PLATFORM: &str = "X-Platform";
pub const HEADER_PLATFORM_VERSION: &str = "X-Platform-Version";
pub const HEADER_SDK_VERSION: &str = "X-Version";
pub const HEADER_IS_SANDBOX: &str = "X-Is-Sandbox";
pub const HEADER_IS_BACKGROUNDED: &str = "X-Is-Backgrounded";
pub const HEADER_POST_PARAMS_HASH: &str = "X-Post-Params-Hash";
pub const DEFAULT_LOAD_SHEDDER_HEADER: &str = "x-load-shedder";

// Dispatch
pub const DEFAULT_API_WORKERS: usize = 4;
pub const DEFAULT_TELEMETRY_WORKERS: usize = 1;
pub const DEFAULT_DELAY_MIN_MS: u64 = 0;
pub const DEFAULT_DELAY_MAX_MS: u64 = 5_000;
pub const LONG_DELAY_MIN_MS: u64 = 5_000;
pub const LONG_DELAY_MAX_MS: u64 = 10_000;

// Transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Error body fields
pub const ERROR_CODE_FIELD: &str = "code";
pub const ERROR_MESSAGE_FIELD: &str = "message";
