#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use tollgate_core::testing::MockTransport;
use tollgate_core::{Backend, TaskScheduler};
use tollgate_domain::{BackendConfig, Config, DelayPolicy, DispatchConfig};
use tollgate_infra::scheduling::{DispatchScheduler, DispatchSchedulerConfig};

/// Latency applied by the scripted transport in concurrency scenarios.
pub const TRANSPORT_LATENCY: Duration = Duration::from_millis(200);

/// Generous upper bound for waiting on callbacks.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

pub const CUSTOMER_BODY: &str = r#"{
    "request_date": "2024-05-01T10:00:00Z",
    "subscriber": {
        "original_app_user_id": "user-1",
        "entitlements": {"pro": {"expires_date": null}}
    }
}"#;

pub const OFFERINGS_BODY: &str = r#"{
    "current_offering_id": "default",
    "offerings": [{"identifier": "default", "description": "Standard", "packages": []}]
}"#;

/// Send logs to the test writer when `TOLLGATE_TEST_LOG` is set.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if std::env::var_os("TOLLGATE_TEST_LOG").is_some() {
            tollgate_infra::logging::init("debug");
        }
    });
}

/// Dispatch settings with the given default-tier window and no long delay.
pub fn dispatch_config(default_delay: DelayPolicy) -> DispatchConfig {
    DispatchConfig {
        api_workers: 4,
        telemetry_workers: 1,
        default_delay,
        long_delay: DelayPolicy::immediate(),
    }
}

pub fn config_with(default_delay: DelayPolicy) -> Config {
    let mut config = Config::with_api_key("appl_test_key");
    config.dispatch = dispatch_config(default_delay);
    config
}

/// Backend running on real dispatch schedulers over a scripted transport.
pub struct ScenarioBackend {
    pub backend: Backend,
    pub transport: Arc<MockTransport>,
    pub api: Arc<DispatchScheduler>,
    pub telemetry: Arc<DispatchScheduler>,
}

impl ScenarioBackend {
    pub fn new(default_delay: DelayPolicy) -> Self {
        init_test_logging();
        let dispatch = dispatch_config(default_delay);
        let transport = Arc::new(MockTransport::new().with_latency(TRANSPORT_LATENCY));
        let api = Arc::new(
            DispatchScheduler::new(DispatchSchedulerConfig::api(&dispatch)).expect("api scheduler"),
        );
        let telemetry = Arc::new(
            DispatchScheduler::new(DispatchSchedulerConfig::telemetry(&dispatch))
                .expect("telemetry scheduler"),
        );
        let backend = Backend::new(
            BackendConfig::new("appl_test_key"),
            transport.clone(),
            api.clone() as Arc<dyn TaskScheduler>,
            telemetry.clone() as Arc<dyn TaskScheduler>,
        );
        Self { backend, transport, api, telemetry }
    }

    pub fn wait_idle(&self) {
        self.api.wait_idle(CALLBACK_TIMEOUT).expect("api scheduler idle");
        self.telemetry.wait_idle(CALLBACK_TIMEOUT).expect("telemetry scheduler idle");
    }
}
