//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::fs;

use tempfile::tempdir;
use tollgate_domain::{DelayPolicy, TollgateError};
use tollgate_infra::config;

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "backend": {
            "api_key": "appl_integration",
            "base_url": "https://api.example.com/v1",
            "fallback_base_urls": ["https://fallback.example.com/v1"],
            "platform": {"flavor": "native", "version": "linux"},
            "is_sandbox": true
        },
        "dispatch": {
            "api_workers": 6,
            "telemetry_workers": 2,
            "default_delay": {"min_ms": 0, "max_ms": 250},
            "long_delay": {"min_ms": 500, "max_ms": 1000}
        },
        "transport": {
            "request_timeout_secs": 15,
            "load_shedder_header": "X-Load-Shedder"
        }
    }"#;

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tollgate.json");
    fs::write(&path, json_content).expect("Failed to write config file");

    let config = config::load_from_file(Some(path)).expect("Failed to load config from JSON file");

    assert_eq!(config.backend.api_key, "appl_integration");
    assert_eq!(config.backend.fallback_base_urls, vec!["https://fallback.example.com/v1"]);
    assert!(config.backend.is_sandbox);
    assert_eq!(config.dispatch.api_workers, 6);
    assert_eq!(config.dispatch.telemetry_workers, 2);
    assert_eq!(config.dispatch.default_delay, DelayPolicy::new(0, 250));
    assert_eq!(config.dispatch.long_delay, DelayPolicy::new(500, 1_000));
    assert_eq!(config.transport.request_timeout_secs, 15);
}

#[test]
fn test_load_config_from_toml_file_with_defaults() {
    let toml_content = r#"
[backend]
api_key = "appl_toml"
"#;

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tollgate.toml");
    fs::write(&path, toml_content).expect("Failed to write config file");

    let config = config::load_from_file(Some(path)).expect("Failed to load config from TOML file");

    assert_eq!(config.backend.api_key, "appl_toml");
    assert!(config.backend.fallback_base_urls.is_empty());
    assert_eq!(config.dispatch.default_delay, DelayPolicy::default_tier());
    assert_eq!(config.dispatch.long_delay, DelayPolicy::long_tier());
    assert_eq!(config.transport.request_timeout_secs, 30);
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let toml_content = r#"
[backend]
api_key = "appl_toml"
base_url = "not a url"
"#;

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tollgate.toml");
    fs::write(&path, toml_content).expect("Failed to write config file");

    let result = config::load_from_file(Some(path));
    assert!(matches!(result, Err(TollgateError::Config(msg)) if msg.contains("base_url")));
}

#[test]
fn test_load_config_rejects_malformed_json() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tollgate.json");
    fs::write(&path, r#"{ "backend": { "api_key": "#).expect("Failed to write config file");

    let result = config::load_from_file(Some(path));
    assert!(matches!(result, Err(TollgateError::Config(msg)) if msg.contains("JSON")));
}
