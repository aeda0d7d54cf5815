//! Task entity and its execution state machine.
//!
//! A `Task` wraps one unit of synchronous, already-bound work together with
//! the bookkeeping recorded while running it: status, timing, and either the
//! work's return value or its captured error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::events::{Event, EventBus};
use crate::execution::PermitPool;

use super::types::TaskName;

/// Errors produced by a task's work.
#[derive(Debug, Error)]
pub enum WorkError {
    /// The work reported failure with a message.
    #[error("{0}")]
    Failed(String),

    /// The work panicked; the panic payload message is preserved verbatim.
    #[error("work panicked: {0}")]
    Panicked(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkError {
    /// Create a failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        WorkError::Failed(message.into())
    }

    /// Recover the panic message from a join error raised by the blocking
    /// thread the work ran on.
    pub(crate) fn from_panic(err: tokio::task::JoinError) -> Self {
        match err.try_into_panic() {
            Ok(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else {
                    "non-string panic payload".to_string()
                };
                WorkError::Panicked(message)
            }
            Err(err) => WorkError::Panicked(err.to_string()),
        }
    }
}

/// Execution status of a task.
///
/// Transitions are monotonic: `NotStarted` → `Running` → `Finished`. A task
/// whose work fails still reaches `Finished`; failure is carried in the
/// task's error field, not in its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task has not been submitted for execution yet.
    NotStarted,
    /// Task holds a permit and its work is executing.
    Running,
    /// Task completed, successfully or not, and released its permit.
    Finished,
}

impl TaskStatus {
    /// Whether the task has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Finished)
    }
}

/// The deferred work: zero arguments, parameters bound at construction time.
type Work<T> = Box<dyn FnOnce() -> Result<T, WorkError> + Send + 'static>;

/// One unit of deferred, independently-executable work.
///
/// Constructed by the caller, executed exactly once by the
/// [`BatchExecutor`](crate::BatchExecutor), then handed back for inspection.
/// All bookkeeping fields are written only by the task's own execution
/// thread and read by the caller only after the executor's join barrier, so
/// none of them need locking.
pub struct Task<T> {
    name: TaskName,
    output_visible: bool,
    permits: Arc<PermitPool>,
    work: Option<Work<T>>,
    status: TaskStatus,
    start_time: Option<Instant>,
    finish_time: Option<Instant>,
    outcome: Option<Result<T, WorkError>>,
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("output_visible", &self.output_visible)
            .field("status", &self.status)
            .field("start_time", &self.start_time)
            .field("finish_time", &self.finish_time)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Task<T> {
    /// Create a task wrapping `work`, bound to the given permit pool.
    ///
    /// The task gets a derived name (`task-N`); use [`Task::with_name`] to
    /// attach a meaningful label. When `output_visible` is true the task
    /// emits started/finished notifications while it runs.
    pub fn new(
        work: impl FnOnce() -> Result<T, WorkError> + Send + 'static,
        output_visible: bool,
        permits: Arc<PermitPool>,
    ) -> Self {
        Self {
            name: TaskName::derived(),
            output_visible,
            permits,
            work: Some(Box::new(work)),
            status: TaskStatus::NotStarted,
            start_time: None,
            finish_time: None,
            outcome: None,
        }
    }

    /// Replace the derived name with an explicit one.
    pub fn with_name(mut self, name: impl Into<TaskName>) -> Self {
        self.name = name.into();
        self
    }

    /// The task's label.
    pub fn name(&self) -> &TaskName {
        &self.name
    }

    /// Whether this task emits started/finished notifications.
    pub fn output_visible(&self) -> bool {
        self.output_visible
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// The work's return value, if it completed without error.
    pub fn result(&self) -> Option<&T> {
        match &self.outcome {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// The captured error, if the work failed or panicked.
    pub fn error(&self) -> Option<&WorkError> {
        match &self.outcome {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// When the task acquired its permit and began running.
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// When the task finished.
    pub fn finish_time(&self) -> Option<Instant> {
        self.finish_time
    }

    /// Wall-clock time between start and finish, once both are recorded.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }

    /// Whether this task is bound to the given pool instance.
    pub(crate) fn shares_pool(&self, pool: &Arc<PermitPool>) -> bool {
        Arc::ptr_eq(&self.permits, pool)
    }

    /// Execute the work, bounded by the permit pool.
    ///
    /// Runs on its own spawned tokio task. Acquires a permit (waiting if the
    /// pool is exhausted), runs the work on the blocking pool, and releases
    /// the permit before recording the finish, whether the work succeeded,
    /// failed, or panicked.
    pub(crate) async fn run(mut self, bus: Arc<EventBus>) -> Self {
        let permit = self.permits.acquire().await;

        self.start_time = Some(Instant::now());
        self.status = TaskStatus::Running;
        debug!(task = %self.name, "task started");
        if self.output_visible {
            bus.emit(Event::started(self.name.clone())).await;
        }

        let work = self.work.take().expect("task work already consumed");
        // A panic in the work unwinds its blocking thread, not this one; it
        // comes back as a join error and is recorded like any other failure.
        let outcome = match tokio::task::spawn_blocking(work).await {
            Ok(result) => result,
            Err(join_err) => Err(WorkError::from_panic(join_err)),
        };
        self.outcome = Some(outcome);

        drop(permit);

        let finished_at = Instant::now();
        let elapsed = self
            .start_time
            .map(|start| finished_at - start)
            .unwrap_or_default();
        self.finish_time = Some(finished_at);
        self.status = TaskStatus::Finished;
        debug!(
            task = %self.name,
            elapsed_secs = elapsed.as_secs_f64(),
            failed = self.error().is_some(),
            "task finished"
        );
        if self.output_visible {
            bus.emit(Event::finished(self.name.clone(), elapsed)).await;
        }

        self
    }
}
