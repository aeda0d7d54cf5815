pub mod core;
pub mod events;
pub mod execution;

pub use core::task::{Task, TaskStatus, WorkError};
pub use core::types::TaskName;
pub use events::{format_event, ConsoleReporter, Event, EventBus, EventHandler};
pub use execution::{BatchExecutor, ExecError, PermitPool, PoolError};
