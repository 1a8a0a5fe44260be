// src/config/mod.rs

//! Project manifest loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest file from disk (`loader.rs`).
//! - Validate basic invariants like task-graph acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    BuildSection, CopySpec, DeploySection, Manifest, ServeSection, TaskConfig, WatchSection,
};
pub use validate::validate_manifest;
