// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::Manifest;
use crate::config::validate::validate_manifest;
use crate::errors::Result;

/// Load a manifest from a given path and return the raw `Manifest`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (task-graph correctness, etc.). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let manifest: Manifest = toml::from_str(&contents)?;
    Ok(manifest)
}

/// Load a manifest from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - tasks with zero or two kinds (`cmd` / `copy`),
///   - unknown `after` references,
///   - graph cycles,
///   - empty copy sources.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let manifest = load_from_path(&path)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}
