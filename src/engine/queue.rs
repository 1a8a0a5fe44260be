// src/engine/queue.rs

use std::collections::HashSet;

use tracing::debug;

use super::runtime::TaskName;

/// Set of triggers that arrived while a run was already executing.
///
/// Semantics:
/// - Triggers for the same task coalesce; a burst of saves to one stylesheet
///   queues the styles task once.
/// - When the runtime becomes idle it calls [`drain`](Self::drain), which
///   empties the set and starts a single new run covering everything that
///   was queued. If partials and html both queued while running, the next
///   run unions them and the scheduler runs the shared subgraph once.
#[derive(Debug, Default)]
pub struct PendingTriggers {
    tasks: HashSet<TaskName>,
}

impl PendingTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Record that a task was triggered while a run is in progress.
    pub fn record(&mut self, task: &str) {
        let inserted = self.tasks.insert(task.to_string());
        debug!(task = %task, inserted, "recorded trigger for next run");
    }

    /// Drain all pending triggers into a vector of task names for a new run.
    pub fn drain(&mut self) -> Vec<TaskName> {
        let tasks: Vec<TaskName> = self.tasks.drain().collect();
        debug!(drained = tasks.len(), "drained queued triggers into new run");
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_triggers_coalesce() {
        let mut pending = PendingTriggers::new();
        pending.record("styles");
        pending.record("styles");
        pending.record("html");

        let mut drained = pending.drain();
        drained.sort();
        assert_eq!(drained, vec!["html", "styles"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn drain_on_empty_set_yields_nothing() {
        let mut pending = PendingTriggers::new();
        assert!(pending.is_empty());
        assert!(pending.drain().is_empty());
    }
}
