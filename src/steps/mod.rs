// src/steps/mod.rs

//! Step execution layer.
//!
//! This module actually performs the work the scheduler dispatches:
//!
//! - [`runner`] owns the executor loop which consumes `ScheduledStep`s;
//!   `cmd` tasks run external tools via `tokio::process::Command`, `copy`
//!   tasks call into [`copy`]. Results flow back to the orchestration
//!   runtime via `RuntimeEvent`s.
//! - [`copy`] is the built-in glob-driven file copy used for assets,
//!   favicons and other pass-through files.
//! - [`clean`] deletes/regenerates the output directory.
//! - [`deploy`] publishes the output directory.

pub mod clean;
pub mod copy;
pub mod deploy;
pub mod runner;

pub use runner::{spawn_executor, StepContext};
