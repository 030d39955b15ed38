//! Configuration loader
//!
//! Loads SDK configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment when one exists
//! 2. Attempts to load from environment variables
//! 3. If `TOLLGATE_API_KEY` is missing, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `TOLLGATE_API_KEY`: Public API key (required)
//! - `TOLLGATE_BASE_URL`: Primary backend base URL
//! - `TOLLGATE_FALLBACK_BASE_URLS`: Comma separated fallback base URLs
//! - `TOLLGATE_PLATFORM_FLAVOR` / `TOLLGATE_PLATFORM_VERSION`: Platform headers
//! - `TOLLGATE_IS_SANDBOX`: Sandbox store flag (true/false)
//! - `TOLLGATE_API_WORKERS`: API scheduler pool size
//! - `TOLLGATE_TELEMETRY_WORKERS`: Telemetry scheduler pool size
//! - `TOLLGATE_DEFAULT_DELAY_MS`: Default tier window, `min-max` or a single value
//! - `TOLLGATE_LONG_DELAY_MS`: Long tier window, `min-max` or a single value
//! - `TOLLGATE_REQUEST_TIMEOUT_SECS`: Transport request timeout
//! - `TOLLGATE_LOAD_SHEDDER_HEADER`: Response header marking load-shedder replies
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tollgate.json` or `./tollgate.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tollgate_domain::{Config, DelayPolicy, Result, TollgateError};

const CONFIG_FILE_NAMES: [&str; 4] = ["tollgate.json", "tollgate.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the API key is not
/// set there, falls back to a config file.
///
/// # Errors
/// Returns `TollgateError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Validation fails
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `TOLLGATE_API_KEY` is required; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns `TollgateError::Config` if the API key is missing, a variable has
/// an invalid value, or validation fails.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::with_api_key(env_var("TOLLGATE_API_KEY")?);

    if let Some(base_url) = env_opt("TOLLGATE_BASE_URL") {
        config.backend.base_url = base_url;
    }
    if let Some(fallbacks) = env_opt("TOLLGATE_FALLBACK_BASE_URLS") {
        config.backend.fallback_base_urls = fallbacks
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(flavor) = env_opt("TOLLGATE_PLATFORM_FLAVOR") {
        config.backend.platform.flavor = flavor;
    }
    if let Some(version) = env_opt("TOLLGATE_PLATFORM_VERSION") {
        config.backend.platform.version = version;
    }
    config.backend.is_sandbox = env_bool("TOLLGATE_IS_SANDBOX", false);

    if let Some(workers) = env_parse::<usize>("TOLLGATE_API_WORKERS", "API workers")? {
        config.dispatch.api_workers = workers;
    }
    if let Some(workers) = env_parse::<usize>("TOLLGATE_TELEMETRY_WORKERS", "telemetry workers")? {
        config.dispatch.telemetry_workers = workers;
    }
    if let Some(raw) = env_opt("TOLLGATE_DEFAULT_DELAY_MS") {
        config.dispatch.default_delay = parse_delay_window(&raw)?;
    }
    if let Some(raw) = env_opt("TOLLGATE_LONG_DELAY_MS") {
        config.dispatch.long_delay = parse_delay_window(&raw)?;
    }

    if let Some(secs) = env_parse::<u64>("TOLLGATE_REQUEST_TIMEOUT_SECS", "request timeout")? {
        config.transport.request_timeout_secs = secs;
    }
    if let Some(header) = env_opt("TOLLGATE_LOAD_SHEDDER_HEADER") {
        config.transport.load_shedder_header = header;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TollgateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TollgateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TollgateError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TollgateError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, detecting the format by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TollgateError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TollgateError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TollgateError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory and up to two parents, then the
/// executable's directory and its parents.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Parse a delay window written as `min-max` or as a single fixed value.
///
/// # Errors
/// Returns `TollgateError::Config` when either bound is not a number or when
/// `min` exceeds `max`.
pub fn parse_delay_window(raw: &str) -> Result<DelayPolicy> {
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| TollgateError::Config(format!("Invalid delay '{raw}': {e}")))
    };

    let policy = match raw.split_once('-') {
        Some((min, max)) => DelayPolicy::new(parse(min)?, parse(max)?),
        None => DelayPolicy::fixed(parse(raw)?),
    };

    if policy.min_ms > policy.max_ms {
        return Err(TollgateError::Config(format!("Invalid delay '{raw}': min exceeds max")));
    }
    Ok(policy)
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TollgateError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional, non-blank environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, label: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TollgateError::Config(format!("Invalid {label}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
