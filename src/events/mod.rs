//! Task lifecycle events and notification handling.
//!
//! Tasks with a visible output flag publish started/finished events to an
//! [`EventBus`]; handlers turn them into caller-facing notifications. The
//! [`ConsoleReporter`] prints the textual reporting contract lines.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::TaskName;

mod console;

pub use console::{format_event, ConsoleReporter};

/// Lifecycle events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum Event {
    /// A task acquired its permit and began running.
    TaskStarted { name: TaskName, timestamp: Instant },

    /// A task finished, successfully or not.
    TaskFinished {
        name: TaskName,
        duration: Duration,
        timestamp: Instant,
    },
}

impl Event {
    /// Create a TaskStarted event.
    pub fn started(name: TaskName) -> Self {
        Event::TaskStarted {
            name,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskFinished event.
    pub fn finished(name: TaskName, duration: Duration) -> Self {
        Event::TaskFinished {
            name,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Name of the task the event belongs to.
    pub fn task_name(&self) -> &TaskName {
        match self {
            Event::TaskStarted { name, .. } => name,
            Event::TaskFinished { name, .. } => name,
        }
    }

    /// When the event was created.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::TaskStarted { timestamp, .. } => *timestamp,
            Event::TaskFinished { timestamp, .. } => *timestamp,
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Create a bus with a single pre-registered handler.
    pub fn with_handler(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            handlers: RwLock::new(vec![handler]),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
