// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the task-graph scheduler
//! - the pending-trigger set (what happens when file changes arrive while a
//!   run is active)
//! - the main runtime event loop that reacts to:
//!   - file-watch triggers
//!   - one-shot run requests (build / run)
//!   - task completion events
//!   - shutdown signals

pub mod queue;
pub mod runtime;

pub use queue::PendingTriggers;
pub use runtime::{Runtime, RuntimeEvent, RuntimeOptions, TaskName, TaskOutcome};
