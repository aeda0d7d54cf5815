//! Batch execution.
//!
//! This module provides the bounded-concurrency infrastructure for running
//! batches of independent tasks: the shared permit pool and the executor
//! that starts every task and waits for collective completion.

mod executor;
mod permits;

pub use executor::{BatchExecutor, ExecError};
pub use permits::{PermitPool, PoolError};
