//! Fully wired client
//!
//! [`TollgateClient`] owns the production adapters behind a core
//! [`Backend`]: a [`ReqwestTransport`], one [`DispatchScheduler`] for API
//! traffic, one for telemetry, and the [`DispatchMetrics`] observer.
//!
//! The blocking transport must be created and dropped outside of an async
//! context.

use std::sync::Arc;
use std::time::Duration;

use tollgate_core::{Backend, TaskScheduler, Transport};
use tollgate_domain::{Config, Result};
use tracing::info;

use crate::config;
use crate::http::ReqwestTransport;
use crate::observability::DispatchMetrics;
use crate::scheduling::{DispatchScheduler, DispatchSchedulerConfig};

pub struct TollgateClient {
    backend: Backend,
    api_scheduler: Arc<DispatchScheduler>,
    telemetry_scheduler: Arc<DispatchScheduler>,
    metrics: Arc<DispatchMetrics>,
}

impl TollgateClient {
    /// Build a client talking to the configured backend over HTTP.
    ///
    /// # Errors
    /// Returns `TollgateError::Config` for invalid configuration and
    /// `TollgateError::Internal` if a scheduler runtime cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config.transport)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Load configuration with [`config::load`] and build a client from it.
    pub fn from_env() -> Result<Self> {
        Self::new(config::load()?)
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let api_scheduler =
            Arc::new(DispatchScheduler::new(DispatchSchedulerConfig::api(&config.dispatch))?);
        let telemetry_scheduler =
            Arc::new(DispatchScheduler::new(DispatchSchedulerConfig::telemetry(&config.dispatch))?);
        let metrics = Arc::new(DispatchMetrics::new());

        let backend = Backend::new(
            config.backend,
            transport,
            Arc::clone(&api_scheduler) as Arc<dyn TaskScheduler>,
            Arc::clone(&telemetry_scheduler) as Arc<dyn TaskScheduler>,
        )
        .with_observer(Arc::clone(&metrics) as _);

        info!(base_url = %backend.config().base_url, "tollgate client ready");

        Ok(Self { backend, api_scheduler, telemetry_scheduler, metrics })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Accepted tasks not yet finished on either scheduler.
    pub fn pending(&self) -> usize {
        self.api_scheduler.pending() + self.telemetry_scheduler.pending()
    }

    /// Block until both schedulers have drained or `timeout` elapses.
    ///
    /// # Errors
    /// Returns `TollgateError::Internal` when the timeout is reached first.
    pub fn wait_idle(&self, timeout: Duration) -> Result<()> {
        self.api_scheduler.wait_idle(timeout)?;
        self.telemetry_scheduler.wait_idle(timeout)?;
        Ok(())
    }

    /// Stop accepting work. Tasks already accepted still complete.
    pub fn shutdown(&self) {
        self.backend.shutdown();
    }
}

impl std::ops::Deref for TollgateClient {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}
