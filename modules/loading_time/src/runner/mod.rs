//! Bounded worker pool for calculation work items.
//!
//! `pool_size` long-lived workers pull from one unbounded queue, so
//! submission never blocks and never rejects while the runner is open.
//! Completion order follows the simulated delay, not submission order.
//!
//! Per item, strictly in order: validate -> delay -> estimate -> inject
//! failure -> notify observers. Panics anywhere in the first four steps turn
//! into a failure result; the worker keeps serving the queue.

pub mod handle;
pub mod simulation;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::{CalculationRequest, CalculationResult, LoadingTimeEstimator};

pub use handle::{TaskCompleter, TaskHandle, TaskId};
pub use simulation::Simulation;

/// Failure text for requests that lack an identifier or required crane data.
pub const INVALID_INPUT_MESSAGE: &str = "invalid input data";
/// Failure text for injected failures.
pub const RANDOM_FAILURE_MESSAGE: &str = "calculation failed randomly";

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerError {
    #[error("task runner is shut down")]
    Closed,
}

struct WorkItem {
    request: CalculationRequest,
    completer: TaskCompleter,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time runner counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    pub pool_size: usize,
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl RunnerStats {
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Items queued or in flight.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.completed())
    }
}

struct WorkerContext {
    simulation: Simulation,
    estimator: Arc<dyn LoadingTimeEstimator>,
    counters: Arc<Counters>,
}

/// Cloneable handle to the worker pool.
#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    queue: Mutex<Option<mpsc::UnboundedSender<WorkItem>>>,
    workers: Mutex<JoinSet<()>>,
    counters: Arc<Counters>,
    reporters: TaskTracker,
    pool_size: usize,
}

impl TaskRunner {
    /// Spawn `pool_size` workers (at least one).
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn start(
        pool_size: usize,
        simulation: Simulation,
        estimator: Arc<dyn LoadingTimeEstimator>,
    ) -> Self {
        let pool_size = pool_size.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());
        let ctx = Arc::new(WorkerContext {
            simulation,
            estimator,
            counters: Arc::clone(&counters),
        });

        let mut workers = JoinSet::new();
        for index in 0..pool_size {
            workers.spawn(worker_loop(index, Arc::clone(&rx), Arc::clone(&ctx)));
        }
        info!(pool_size, "task runner started");

        Self {
            inner: Arc::new(RunnerInner {
                queue: Mutex::new(Some(tx)),
                workers: Mutex::new(workers),
                counters,
                reporters: TaskTracker::new(),
                pool_size,
            }),
        }
    }

    /// Queue a work item and return immediately.
    ///
    /// # Errors
    /// Returns [`RunnerError::Closed`] once [`TaskRunner::shutdown`] has started.
    pub fn submit(&self, request: CalculationRequest) -> Result<TaskHandle, RunnerError> {
        let queue = self.inner.queue.lock();
        let tx = queue.as_ref().ok_or(RunnerError::Closed)?;

        let (handle, completer) =
            handle::task_pair(request.request_ship_id.clone(), self.inner.reporters.clone());
        let request_ship_id = request.request_ship_id.clone();
        tx.send(WorkItem { request, completer })
            .map_err(|_| RunnerError::Closed)?;
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);

        debug!(task_id = %handle.id(), %request_ship_id, "work item queued");
        Ok(handle)
    }

    #[must_use]
    pub fn stats(&self) -> RunnerStats {
        let c = &self.inner.counters;
        RunnerStats {
            pool_size: self.inner.pool_size,
            submitted: c.submitted.load(Ordering::Relaxed),
            succeeded: c.succeeded.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.queue.lock().is_none()
    }

    /// Stop accepting work and let workers drain the queue for up to `grace`.
    ///
    /// Workers still running after `grace` are aborted, and their items plus
    /// anything still queued resolve as abandoned. Completion reports then get
    /// a second window of `grace` to finish, so the call returns within
    /// `2 * grace`. Reports still running after that are dropped.
    ///
    /// Returns `true` if every item finished and was reported in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        drop(self.inner.queue.lock().take());
        let mut workers = std::mem::take(&mut *self.inner.workers.lock());
        info!(pending = self.stats().pending(), grace = ?grace, "draining task runner");

        let drained = tokio::time::timeout(grace, drain(&mut workers))
            .await
            .is_ok();
        if !drained {
            warn!(
                pending = self.stats().pending(),
                "task runner did not drain in time; aborting workers"
            );
            workers.shutdown().await;
        }

        let reporters = &self.inner.reporters;
        reporters.close();
        let reported = tokio::time::timeout(grace, reporters.wait())
            .await
            .is_ok();
        if !reported {
            warn!(
                outstanding = reporters.len(),
                "completion reports still running after grace; dropping them"
            );
        }
        drained && reported
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined
            && e.is_panic()
        {
            error!(error = %e, "worker terminated by panic");
        }
    }
}

async fn worker_loop(
    index: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
    ctx: Arc<WorkerContext>,
) {
    debug!(worker = index, "worker started");
    loop {
        let next = { queue.lock().await.recv().await };
        let Some(item) = next else {
            debug!(worker = index, "queue closed, worker exiting");
            break;
        };

        let span = info_span!(
            "work_item",
            worker = index,
            task_id = %item.completer.id(),
            request_ship_id = %item.request.request_ship_id,
        );
        ctx.process(item).instrument(span).await;
    }
}

impl WorkerContext {
    async fn process(&self, item: WorkItem) {
        let WorkItem { request, completer } = item;

        let result = match AssertUnwindSafe(self.execute(&request))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(error = %message, "calculation panicked");
                CalculationResult::failure(request.request_ship_id.clone(), message)
            }
        };

        if result.is_success() {
            self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }

        completer.complete(result).await;
    }

    async fn execute(&self, request: &CalculationRequest) -> CalculationResult {
        let id = request.request_ship_id.clone();

        let Some(input) = request.validated() else {
            warn!("rejecting work item: {INVALID_INPUT_MESSAGE}");
            return CalculationResult::failure(id, INVALID_INPUT_MESSAGE);
        };

        info!("starting loading time calculation");
        let delay = self.simulation.sample_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let loading_time = self.estimator.estimate(&input);

        if self.simulation.should_fail() {
            info!(loading_time, "injected failure");
            return CalculationResult::failure(id, RANDOM_FAILURE_MESSAGE);
        }

        info!(loading_time, delay = ?delay, "loading time calculated");
        CalculationResult::success(id, loading_time)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "calculation panicked".to_owned()
    }
}
