// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::Manifest;
use crate::errors::{Result, SitepipeError};

/// Run basic semantic validation against a loaded manifest.
///
/// This checks:
/// - there is at least one task
/// - every task has exactly one kind (`cmd` or `copy`)
/// - copy tasks have at least one `src` glob
/// - all `after` dependencies refer to existing tasks (and not the task itself)
/// - the task graph has no cycles
///
/// It does **not** check that the commands themselves are runnable; a missing
/// external tool surfaces as a task failure at execution time.
pub fn validate_manifest(manifest: &Manifest) -> Result<()> {
    ensure_has_tasks(manifest)?;
    validate_task_kinds(manifest)?;
    validate_task_dependencies(manifest)?;
    validate_dag(manifest)?;
    Ok(())
}

fn ensure_has_tasks(manifest: &Manifest) -> Result<()> {
    if manifest.task.is_empty() {
        return Err(SitepipeError::Config(
            "manifest must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_kinds(manifest: &Manifest) -> Result<()> {
    for (name, task) in manifest.task.iter() {
        match (&task.cmd, &task.copy) {
            (Some(_), Some(_)) => {
                return Err(SitepipeError::Config(format!(
                    "task '{name}' declares both `cmd` and `copy`; pick one"
                )));
            }
            (None, None) => {
                return Err(SitepipeError::Config(format!(
                    "task '{name}' declares neither `cmd` nor `copy`"
                )));
            }
            (None, Some(copy)) if copy.src.is_empty() => {
                return Err(SitepipeError::Config(format!(
                    "task '{name}' has an empty copy `src` list"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_task_dependencies(manifest: &Manifest) -> Result<()> {
    for (name, task) in manifest.task.iter() {
        for dep in task.after.iter() {
            if !manifest.task.contains_key(dep) {
                return Err(SitepipeError::Config(format!(
                    "task '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
            if dep == name {
                return Err(SitepipeError::Config(format!(
                    "task '{name}' cannot depend on itself in `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(manifest: &Manifest) -> Result<()> {
    // Edge direction: dep -> task. For:
    //   [task.html]
    //   after = ["partials"]
    // we add edge partials -> html.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in manifest.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in manifest.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SitepipeError::TaskCycle(cycle.node_id().to_string())),
    }
}
