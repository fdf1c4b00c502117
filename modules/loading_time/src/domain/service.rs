//! Domain service tying the runner to the completion observer.

use std::sync::Arc;

use tracing::{info, instrument};

use super::error::DomainError;
use super::model::CalculationRequest;
use super::ports::CompletionObserver;
use crate::runner::{RunnerStats, TaskHandle, TaskRunner};

/// Accepts calculation requests and schedules them for asynchronous execution.
///
/// The configured observer (the callback dispatcher in production) is
/// attached to every submitted item.
#[derive(Clone)]
pub struct LoadingTimeService {
    runner: TaskRunner,
    observer: Arc<dyn CompletionObserver>,
}

impl LoadingTimeService {
    #[must_use]
    pub fn new(runner: TaskRunner, observer: Arc<dyn CompletionObserver>) -> Self {
        Self { runner, observer }
    }

    /// Submit the request and register the completion observer. Never waits on the work.
    ///
    /// # Errors
    /// Returns [`DomainError::Unavailable`] once the runner is shutting down.
    #[instrument(skip_all, fields(request_ship_id = %request.request_ship_id, variant = ?request.variant))]
    pub fn schedule(&self, request: CalculationRequest) -> Result<TaskHandle, DomainError> {
        let handle = self.runner.submit(request)?;
        handle.on_complete(Arc::clone(&self.observer));
        info!(task_id = %handle.id(), "loading time calculation scheduled");
        Ok(handle)
    }

    #[must_use]
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    #[must_use]
    pub fn stats(&self) -> RunnerStats {
        self.runner.stats()
    }
}
