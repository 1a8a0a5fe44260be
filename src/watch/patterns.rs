// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::engine::TaskName;

/// Raw per-task pattern specification taken from the manifest.
///
/// - `watch` / `exclude` are the task's own lists, relative to the project
///   root.
/// - Tasks with an empty `watch` list never react to file changes and get no
///   profile.
#[derive(Debug, Clone)]
pub struct TaskWatchSpec {
    pub name: TaskName,
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
}

/// Compiled watch/exclude glob patterns for a single task.
///
/// The watcher passes project-root-relative paths (e.g. `"src/scss/a.scss"`,
/// forward slashes) into `matches`.
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    /// Name of the task this profile belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this task is interested in the given path.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a compiled watch profile for each task that declares watch patterns.
///
/// The global `[watch].exclude` list is appended to every task's own exclude
/// list, so editor droppings can be excluded once for the whole project.
pub fn build_task_watch_profiles(
    global_exclude: &[String],
    specs: &[TaskWatchSpec],
) -> Result<Vec<TaskWatchProfile>> {
    let mut profiles = Vec::new();

    for spec in specs {
        if spec.watch.is_empty() {
            continue;
        }

        let watch_set = build_globset(&spec.watch)
            .with_context(|| format!("building watch globset for task {}", spec.name))?;

        let mut exclude_patterns = spec.exclude.clone();
        exclude_patterns.extend(global_exclude.iter().cloned());

        let exclude_set = if exclude_patterns.is_empty() {
            None
        } else {
            Some(
                build_globset(&exclude_patterns)
                    .with_context(|| format!("building exclude globset for task {}", spec.name))?,
            )
        };

        profiles.push(TaskWatchProfile {
            name: spec.name.clone(),
            watch_set,
            exclude_set,
        });
    }

    Ok(profiles)
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
