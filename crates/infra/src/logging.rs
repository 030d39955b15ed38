//! Structured logging setup
//!
//! Installs a global `tracing-subscriber` with an [`EnvFilter`] read from
//! `TOLLGATE_LOG` and a pretty or JSON formatter chosen by
//! `TOLLGATE_LOG_FORMAT`. Installation happens at most once per process;
//! later calls are no-ops.
//!
//! ```rust,no_run
//! tollgate_infra::logging::init("info");
//! tracing::info!("client starting");
//! ```

use std::str::FromStr;
use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable holding the filter directive
pub const LOG_FILTER_ENV: &str = "TOLLGATE_LOG";
/// Environment variable selecting `json` or `pretty` output
pub const LOG_FORMAT_ENV: &str = "TOLLGATE_LOG_FORMAT";

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("Invalid LogFormat: {other}")),
        }
    }
}

impl LogFormat {
    /// Format from `TOLLGATE_LOG_FORMAT`, pretty when unset or unknown.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV).ok().and_then(|raw| raw.parse().ok()).unwrap_or_default()
    }
}

/// Install the global subscriber with `default_filter` as the fallback filter.
///
/// Returns `true` if this call installed the subscriber.
pub fn init(default_filter: &str) -> bool {
    init_with_format(default_filter, LogFormat::from_env())
}

/// Install the global subscriber with an explicit output format.
pub fn init_with_format(default_filter: &str, format: LogFormat) -> bool {
    let mut installed_now = false;
    INSTALLED.get_or_init(|| {
        installed_now = install(default_filter, format);
        installed_now
    });
    installed_now
}

fn install(default_filter: &str, format: LogFormat) -> bool {
    let filter = build_filter(std::env::var(LOG_FILTER_ENV).ok().as_deref(), default_filter);
    let registry = Registry::default().with(filter);

    let result = match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    // Another subscriber was already installed by the host application.
    result.is_ok()
}

fn build_filter(directive: Option<&str>, default_filter: &str) -> EnvFilter {
    directive
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_formats() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn falls_back_to_default_filter() {
        assert_eq!(build_filter(None, "warn").to_string(), "warn");
        assert_eq!(build_filter(Some("  "), "info").to_string(), "info");
        assert_eq!(build_filter(Some("tollgate_core=debug"), "info").to_string(), "tollgate_core=debug");
    }

    #[test]
    fn second_init_is_a_noop() {
        let _ = init_with_format("info", LogFormat::Pretty);
        assert!(!init_with_format("debug", LogFormat::Json));
    }
}
