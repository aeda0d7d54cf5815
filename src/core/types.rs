//! Task naming.
//!
//! `TaskName` is the human-readable label attached to every task; it shows
//! up in started/finished notifications and in error reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter backing derived names. Process-wide so two batches never hand out
/// the same default label.
static NEXT_TASK_NUMBER: AtomicU64 = AtomicU64::new(1);

/// Human-readable label for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskName(String);

impl TaskName {
    /// Create a name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive a default label (`task-1`, `task-2`, ...) for tasks created
    /// without an explicit name.
    pub fn derived() -> Self {
        let n = NEXT_TASK_NUMBER.fetch_add(1, Ordering::Relaxed);
        Self(format!("task-{}", n))
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
