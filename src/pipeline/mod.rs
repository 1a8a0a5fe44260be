// src/pipeline/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`graph`] holds the directed acyclic dependency structure of tasks.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready to run, and when dependents can be scheduled.

pub mod graph;
pub mod scheduler;

pub use graph::TaskGraph;
pub use scheduler::{ScheduledStep, Scheduler, StepKind};
