// src/pipeline/graph.rs

use std::collections::{HashMap, HashSet};

use crate::config::model::Manifest;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct TaskNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<String>,
}

/// Simple in-memory DAG representation keyed by task name.
///
/// This is intentionally lightweight; acyclicity is already checked in
/// `config::validate`, so here we just keep adjacency information for
/// scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: HashMap<String, TaskNode>,
}

impl TaskGraph {
    /// Build a task graph from a validated [`Manifest`].
    ///
    /// Assumes that all `after` references are valid and there are no cycles.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut nodes: HashMap<String, TaskNode> = HashMap::new();

        for (name, task) in manifest.task.iter() {
            nodes.insert(
                name.clone(),
                TaskNode {
                    deps: task.after.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        let task_names: Vec<String> = nodes.keys().cloned().collect();
        for task_name in task_names {
            let deps = nodes
                .get(&task_name)
                .map(|n| n.deps.clone())
                .unwrap_or_default();

            for dep in deps {
                if let Some(dep_node) = nodes.get_mut(&dep) {
                    dep_node.dependents.push(task_name.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one in `after`).
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// The task itself plus all transitive dependencies, e.g. what must run
    /// for `sitepipe run <task>` to produce its output from scratch.
    pub fn upstream_closure(&self, name: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![name.to_string()];

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for dep in self.dependencies_of(&current) {
                stack.push(dep.clone());
            }
        }

        seen.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Manifest, TaskConfig};
    use std::collections::BTreeMap;

    fn task(cmd: &str, after: &[&str]) -> TaskConfig {
        TaskConfig {
            cmd: Some(cmd.to_string()),
            copy: None,
            after: after.iter().map(|s| s.to_string()).collect(),
            watch: vec![],
            exclude: vec![],
            fail_after_error: true,
            reload: true,
        }
    }

    fn manifest() -> Manifest {
        let mut tasks = BTreeMap::new();
        tasks.insert("partials".into(), task("echo partials", &[]));
        tasks.insert("html".into(), task("echo html", &["partials"]));
        tasks.insert("minify".into(), task("echo minify", &["html"]));
        tasks.insert("styles".into(), task("echo styles", &[]));

        Manifest {
            build: Default::default(),
            serve: Default::default(),
            deploy: Default::default(),
            watch: Default::default(),
            task: tasks,
        }
    }

    #[test]
    fn upstream_closure_includes_transitive_deps() {
        let graph = TaskGraph::from_manifest(&manifest());
        let mut closure = graph.upstream_closure("minify");
        closure.sort();
        assert_eq!(closure, vec!["html", "minify", "partials"]);
    }

    #[test]
    fn dependents_follow_after_edges() {
        let graph = TaskGraph::from_manifest(&manifest());
        assert_eq!(graph.dependents_of("partials"), ["html"]);
        assert_eq!(graph.dependents_of("html"), ["minify"]);
        assert!(graph.dependents_of("minify").is_empty());
    }
}
