//! Console reporting of task notifications.
//!
//! The line format is a contract: downstream tooling (lint aggregators and
//! the like) matches on the literal `started:` and `finished:` prefixes, so
//! these must not change.

use async_trait::async_trait;

use super::{Event, EventHandler};

/// Render an event as its notification line.
///
/// - `started: {name}`
/// - `finished: {name}, time taken: {secs}s`
pub fn format_event(event: &Event) -> String {
    match event {
        Event::TaskStarted { name, .. } => format!("started: {}", name),
        Event::TaskFinished { name, duration, .. } => format!(
            "finished: {}, time taken: {:.2}s",
            name,
            duration.as_secs_f64()
        ),
    }
}

/// Event handler that prints notification lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Create a console reporter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for ConsoleReporter {
    async fn handle(&self, event: &Event) {
        println!("{}", format_event(event));
    }
}
