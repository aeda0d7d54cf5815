//! Core task types: the task entity, its state machine, and naming.

pub mod task;
pub mod types;
