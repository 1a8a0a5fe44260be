// src/steps/copy.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::model::CopySpec;

/// Execute a copy step: every file under `source_dir` matching one of the
/// `src` globs is copied into `out_dir/<dest>`.
///
/// Relative paths are preserved unless `flatten` is set, in which case only
/// the file name is kept (collisions resolve to whichever file is visited
/// last). Returns the number of files copied.
///
/// Copying is idempotent: re-running with unchanged sources rewrites the same
/// byte-identical file set.
pub fn run_copy(source_dir: &Path, out_dir: &Path, spec: &CopySpec) -> Result<usize> {
    let glob_set = build_globset(&spec.src)?;
    let dest_root = if spec.dest.is_empty() {
        out_dir.to_path_buf()
    } else {
        out_dir.join(&spec.dest)
    };

    let mut files = Vec::new();
    collect_files(source_dir, source_dir, &glob_set, &mut files)?;
    // Stable order so flatten collisions resolve deterministically.
    files.sort();

    for rel in &files {
        let from = source_dir.join(rel);
        let to = if spec.flatten {
            match rel.file_name() {
                Some(name) => dest_root.join(name),
                None => continue,
            }
        } else {
            dest_root.join(rel)
        };

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {parent:?}"))?;
        }
        fs::copy(&from, &to).with_context(|| format!("copying {from:?} to {to:?}"))?;
        debug!(from = ?from, to = ?to, "copied file");
    }

    Ok(files.len())
}

/// Copy an entire directory tree, preserving relative paths.
///
/// Used by the deploy step to publish the output directory.
pub fn copy_tree(from_dir: &Path, to_dir: &Path) -> Result<usize> {
    let mut files = Vec::new();
    collect_all_files(from_dir, from_dir, &mut files)?;
    files.sort();

    for rel in &files {
        let from = from_dir.join(rel);
        let to = to_dir.join(rel);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {parent:?}"))?;
        }
        fs::copy(&from, &to).with_context(|| format!("copying {from:?} to {to:?}"))?;
    }

    Ok(files.len())
}

/// Recursively collect files under `dir` whose root-relative path (with
/// forward slashes) matches the glob set.
fn collect_files(
    root: &Path,
    dir: &Path,
    glob_set: &GlobSet,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir).with_context(|| format!("reading directory {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, glob_set, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if glob_set.is_match(&rel_str) {
                out.push(rel.to_path_buf());
            }
        }
    }

    Ok(())
}

fn collect_all_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir).with_context(|| format!("reading directory {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_all_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_path_buf());
        }
    }

    Ok(())
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
