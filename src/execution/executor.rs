//! Batch execution engine.
//!
//! The `BatchExecutor` starts every task of a batch at once, each on its own
//! tokio task, and blocks until all of them have finished. Concurrency is
//! bounded by the shared permit pool, not by how many tasks are spawned:
//! spawned tasks over-subscribe, permits under-subscribe.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

use crate::core::task::Task;
use crate::core::types::TaskName;
use crate::events::{ConsoleReporter, EventBus};

use super::permits::PermitPool;

/// Errors from submitting a batch.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A task was constructed against a different pool than the batch uses.
    #[error("task '{0}' is bound to a different permit pool")]
    PoolMismatch(TaskName),

    /// An execution thread failed outside the task's own work, e.g. a
    /// panicking event handler. Work panics are contained in the task.
    #[error("task execution thread failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Executor that runs a batch of tasks under a shared concurrency bound.
///
/// The executor performs no retries, no cancellation, and no timeouts: work
/// that never returns hangs the whole batch. It also does no aggregation;
/// callers scan the returned tasks for results and errors.
pub struct BatchExecutor {
    /// Bus the tasks publish started/finished notifications to.
    bus: Arc<EventBus>,
}

impl BatchExecutor {
    /// Create an executor that emits no notifications.
    pub fn new() -> Self {
        Self {
            bus: Arc::new(EventBus::new()),
        }
    }

    /// Create an executor that prints started/finished lines to stdout.
    pub fn with_reporter() -> Self {
        Self {
            bus: Arc::new(EventBus::with_handler(Arc::new(ConsoleReporter::new()))),
        }
    }

    /// Create an executor publishing notifications to the given bus.
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// The bus task notifications are published to.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Run every task to completion, bounded by `pool`.
    ///
    /// Every task must have been constructed with the same pool instance
    /// passed here; a mismatch fails the whole batch before anything starts.
    /// Returns the tasks, now carrying terminal state, in submission order.
    /// Completion order between concurrently running tasks is unspecified.
    pub async fn execute<T: Send + 'static>(
        &self,
        tasks: Vec<Task<T>>,
        pool: &Arc<PermitPool>,
    ) -> Result<Vec<Task<T>>, ExecError> {
        if let Some(stray) = tasks.iter().find(|task| !task.shares_pool(pool)) {
            return Err(ExecError::PoolMismatch(stray.name().clone()));
        }
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        debug!(
            task_count = tasks.len(),
            capacity = pool.capacity(),
            "starting batch"
        );

        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let bus = Arc::clone(&self.bus);
            let span = info_span!("task_execution", task = %task.name());
            handles.push(tokio::spawn(task.run(bus).instrument(span)));
        }

        // Join in submission order so the returned list lines up with the
        // caller's input.
        let mut finished = Vec::with_capacity(handles.len());
        for handle in handles {
            finished.push(handle.await?);
        }

        debug!(
            task_count = finished.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "batch finished"
        );
        Ok(finished)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}
