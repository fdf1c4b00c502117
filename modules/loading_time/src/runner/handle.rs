//! Task handles and their single-use completers.
//!
//! A [`TaskHandle`] is returned to the submitter; the matching
//! [`TaskCompleter`] travels with the work item to a worker. Resolving the
//! completer consumes it, so a work item can produce at most one result, and
//! every registered observer runs exactly once against that result.
//!
//! Observers always run on a task spawned into the runner's [`TaskTracker`].
//! A worker waits for its item's observers before taking the next item, but
//! aborting the worker does not cancel a report that is already under way.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::domain::{CalculationResult, CompletionObserver, RequestId};

/// Message used when a work item disappears without being executed.
pub const ABANDONED_MESSAGE: &str = "work item abandoned before completion";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

enum TaskState {
    Pending(Vec<Arc<dyn CompletionObserver>>),
    Done(Arc<CalculationResult>),
}

struct TaskShared {
    state: Mutex<TaskState>,
    completed: Notify,
    reporters: TaskTracker,
}

impl TaskShared {
    /// Store the result and hand back the observers that still need to run.
    fn resolve(&self, result: Arc<CalculationResult>) -> Vec<Arc<dyn CompletionObserver>> {
        let previous = std::mem::replace(&mut *self.state.lock(), TaskState::Done(result));
        self.completed.notify_waiters();
        match previous {
            TaskState::Pending(observers) => observers,
            TaskState::Done(_) => Vec::new(),
        }
    }
}

/// Submitter-side view of a work item.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(*self.shared.state.lock(), TaskState::Done(_))
    }

    #[must_use]
    pub fn try_result(&self) -> Option<Arc<CalculationResult>> {
        match &*self.shared.state.lock() {
            TaskState::Done(result) => Some(Arc::clone(result)),
            TaskState::Pending(_) => None,
        }
    }

    /// Register an observer.
    ///
    /// Before completion the observer is queued and later run on behalf of the
    /// worker that finishes the item. After completion it is run on a freshly
    /// spawned task, never on the caller's stack.
    ///
    /// # Panics
    /// Panics if called after completion outside of a Tokio runtime.
    pub fn on_complete(&self, observer: Arc<dyn CompletionObserver>) {
        let finished = {
            let mut state = self.shared.state.lock();
            match &mut *state {
                TaskState::Pending(observers) => {
                    observers.push(observer);
                    return;
                }
                TaskState::Done(result) => Arc::clone(result),
            }
        };

        self.shared
            .reporters
            .spawn(notify_all(self.id, vec![observer], finished));
    }

    /// Wait until the work item has produced its result.
    pub async fn wait(&self) -> Arc<CalculationResult> {
        loop {
            let notified = self.shared.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.try_result() {
                return result;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Worker-side resolver. Consumed by [`TaskCompleter::complete`].
pub struct TaskCompleter {
    id: TaskId,
    request_ship_id: RequestId,
    shared: Option<Arc<TaskShared>>,
}

impl TaskCompleter {
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Publish the result and run every observer registered so far, in order.
    pub async fn complete(mut self, result: CalculationResult) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        let result = Arc::new(result);
        let observers = shared.resolve(Arc::clone(&result));
        if observers.is_empty() {
            return;
        }

        let reporting = shared.reporters.spawn(notify_all(self.id, observers, result));
        if let Err(e) = reporting.await {
            tracing::error!(task_id = %self.id, error = %e, "completion observers did not finish");
        }
    }
}

impl Drop for TaskCompleter {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };

        tracing::warn!(task_id = %self.id, request_ship_id = %self.request_ship_id, "{ABANDONED_MESSAGE}");
        let result = Arc::new(CalculationResult::failure(
            self.request_ship_id.clone(),
            ABANDONED_MESSAGE,
        ));
        let observers = shared.resolve(Arc::clone(&result));
        if observers.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(task_id = %self.id, "no runtime available to notify observers");
            return;
        };
        shared
            .reporters
            .spawn_on(notify_all(self.id, observers, result), &runtime);
    }
}

/// Create a linked handle/completer pair for a new work item.
pub(crate) fn task_pair(
    request_ship_id: RequestId,
    reporters: TaskTracker,
) -> (TaskHandle, TaskCompleter) {
    let id = TaskId::new();
    let shared = Arc::new(TaskShared {
        state: Mutex::new(TaskState::Pending(Vec::new())),
        completed: Notify::new(),
        reporters,
    });

    let handle = TaskHandle {
        id,
        shared: Arc::clone(&shared),
    };
    let completer = TaskCompleter {
        id,
        request_ship_id,
        shared: Some(shared),
    };
    (handle, completer)
}

async fn notify_all(
    task_id: TaskId,
    observers: Vec<Arc<dyn CompletionObserver>>,
    result: Arc<CalculationResult>,
) {
    for observer in observers {
        notify_observer(task_id, observer.as_ref(), &result).await;
    }
}

/// Run one observer, containing any panic it raises.
async fn notify_observer(
    task_id: TaskId,
    observer: &dyn CompletionObserver,
    result: &CalculationResult,
) {
    if AssertUnwindSafe(observer.on_complete(result))
        .catch_unwind()
        .await
        .is_err()
    {
        tracing::error!(
            task_id = %task_id,
            request_ship_id = %result.request_ship_id,
            "completion observer panicked"
        );
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl CompletionObserver for Counting {
        async fn on_complete(&self, _result: &CalculationResult) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    #[async_trait]
    impl CompletionObserver for Panicking {
        async fn on_complete(&self, _result: &CalculationResult) {
            panic!("observer exploded");
        }
    }

    #[tokio::test]
    async fn observers_registered_before_completion_run_once() {
        let (handle, completer) = task_pair(RequestId::numeric(1), TaskTracker::new());
        let counter = Arc::new(Counting::default());
        handle.on_complete(counter.clone());
        handle.on_complete(counter.clone());

        completer
            .complete(CalculationResult::success(RequestId::numeric(1), 1.0))
            .await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(handle.is_finished());
        assert!(handle.wait().await.is_success());
    }

    #[tokio::test]
    async fn late_observer_still_runs_once() {
        let (handle, completer) = task_pair(RequestId::numeric(2), TaskTracker::new());
        completer
            .complete(CalculationResult::failure(RequestId::numeric(2), "x"))
            .await;

        let counter = Arc::new(Counting::default());
        handle.on_complete(counter.clone());

        for _ in 0..100 {
            if counter.0.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_observer_does_not_block_others() {
        let (handle, completer) = task_pair(RequestId::numeric(3), TaskTracker::new());
        let counter = Arc::new(Counting::default());
        handle.on_complete(Arc::new(Panicking));
        handle.on_complete(counter.clone());

        completer
            .complete(CalculationResult::success(RequestId::numeric(3), 0.5))
            .await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_completer_resolves_as_failure() {
        let (handle, completer) = task_pair(RequestId::from("lost"), TaskTracker::new());
        drop(completer);

        let result = handle.wait().await;
        assert_eq!(result.error_message(), Some(ABANDONED_MESSAGE));
        assert_eq!(result.request_ship_id, RequestId::from("lost"));
    }

    #[tokio::test]
    async fn wait_resolves_when_completed_from_another_task() {
        let (handle, completer) = task_pair(RequestId::numeric(4), TaskTracker::new());
        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.wait().await }
        });

        tokio::task::yield_now().await;
        completer
            .complete(CalculationResult::success(RequestId::numeric(4), 3.0))
            .await;

        let result = waiter.await.unwrap();
        assert_eq!(result.loading_time(), Some(3.0));
    }
}
