// src/steps/clean.rs

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Delete the output directory if it exists.
pub fn remove_out_dir(out_dir: &Path) -> Result<()> {
    match fs::remove_dir_all(out_dir) {
        Ok(()) => {
            info!(out_dir = ?out_dir, "removed output directory");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("removing output directory {out_dir:?}"))
        }
    }
}

/// Delete and recreate the output directory, as done at the start of every
/// full build.
pub fn reset_out_dir(out_dir: &Path) -> Result<()> {
    remove_out_dir(out_dir)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {out_dir:?}"))?;
    Ok(())
}
