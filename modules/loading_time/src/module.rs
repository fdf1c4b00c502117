use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use shipload_bootstrap::{AppConfig, module_config_or_default};
use tracing::{info, warn};

use crate::api::rest::routes;
use crate::config::{LoadingTimeConfig, MODULE_NAME};
use crate::domain::{CraneCapacityEstimator, LoadingTimeService};
use crate::infra::CallbackDispatcher;
use crate::runner::TaskRunner;

/// Wires configuration, runner, dispatcher and REST routes together.
pub struct LoadingTimeModule {
    service: Arc<LoadingTimeService>,
}

impl LoadingTimeModule {
    /// Read `modules.loading_time.config` from the host configuration and start the module.
    ///
    /// # Errors
    /// Fails on malformed or invalid configuration.
    pub fn from_app_config(app: &AppConfig) -> anyhow::Result<Self> {
        let cfg: LoadingTimeConfig = module_config_or_default(app, MODULE_NAME)
            .with_context(|| format!("failed to load '{MODULE_NAME}' module config"))?;
        Self::init(&cfg)
    }

    /// Start the worker pool. Must run inside a Tokio runtime.
    ///
    /// # Errors
    /// Fails when the configuration does not validate or the callback client cannot be built.
    pub fn init(cfg: &LoadingTimeConfig) -> anyhow::Result<Self> {
        info!("Initializing loading_time module");
        cfg.validate().context("invalid loading_time configuration")?;

        let dispatcher =
            CallbackDispatcher::new(&cfg.callback).context("failed to create callback dispatcher")?;
        let runner = TaskRunner::start(
            cfg.runner.pool_size,
            cfg.runner.simulation(),
            Arc::new(CraneCapacityEstimator),
        );
        let service = LoadingTimeService::new(runner, Arc::new(dispatcher));

        info!(
            pool_size = cfg.runner.pool_size,
            callback_base = %cfg.callback.base_url,
            callback_format = ?cfg.callback.format,
            auth = cfg.callback.token.is_some(),
            "loading_time module initialized"
        );
        Ok(Self {
            service: Arc::new(service),
        })
    }

    #[must_use]
    pub fn service(&self) -> Arc<LoadingTimeService> {
        Arc::clone(&self.service)
    }

    #[must_use]
    pub fn register_rest(&self, router: Router) -> Router {
        routes::register_routes(router, self.service())
    }

    /// Stop intake and drain queued work for at most `grace`.
    pub async fn stop(&self, grace: Duration) {
        info!("Stopping loading_time module");
        if self.service.runner().shutdown(grace).await {
            info!("loading_time module stopped");
        } else {
            warn!(
                pending = self.service.stats().pending(),
                "loading_time module stopped with unfinished work"
            );
        }
    }
}
