// src/watch/mod.rs

//! File watching and change-to-task mapping.
//!
//! This module is responsible for:
//! - Compiling `watch` / `exclude` glob patterns per task.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing event bursts before they are flushed into task triggers.
//!
//! It does **not** know about the task graph; it only turns filesystem
//! changes into task-level triggers. Dependent propagation happens in the
//! scheduler.

pub mod patterns;
pub mod watcher;

pub use patterns::{build_task_watch_profiles, TaskWatchProfile, TaskWatchSpec};
pub use watcher::{spawn_watcher, WatcherHandle};
