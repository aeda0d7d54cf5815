//! Bounded counting permit pool.
//!
//! The pool is the single shared mutable resource of a batch: every task
//! acquires one permit before running its work and releases it afterwards,
//! so no more than `capacity` tasks are ever executing at once.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors from constructing a permit pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A zero-capacity pool would block every task forever.
    #[error("permit pool capacity must be at least 1")]
    ZeroCapacity,
}

/// Fixed-capacity counting resource limiting concurrent task execution.
///
/// Shared across tasks by `Arc` and compared by identity: all tasks of one
/// batch must hold the same pool instance, since it is the sole concurrency
/// bound.
#[derive(Debug)]
pub struct PermitPool {
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

impl PermitPool {
    /// Create a pool with the given number of permits.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        })
    }

    /// The configured concurrency bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits not currently held by a running task.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until a permit is free and take it.
    ///
    /// The permit is released when the returned guard is dropped.
    pub(crate) async fn acquire(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("semaphore closed")
    }
}
