// src/pipeline/scheduler.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::model::{CopySpec, Manifest, TaskConfig};
use crate::engine::{TaskName, TaskOutcome};
use crate::pipeline::graph::TaskGraph;

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// Task participates in this run but is waiting on dependencies.
    Pending,
    /// Task has been dispatched to the executor and is currently running.
    Running,
    /// Task completed successfully in this run.
    DoneSuccess,
    /// Task failed in this run (or was blocked by a failed dependency).
    DoneFailed,
}

/// What the executor should actually do for a task.
#[derive(Debug, Clone)]
pub enum StepKind {
    /// External transformation tool, run via the platform shell.
    Command {
        cmd: String,
        /// When false, a non-zero exit only warns (lint-style steps).
        fail_after_error: bool,
    },
    /// Built-in glob copy from the source tree into the output tree.
    Copy(CopySpec),
}

/// Static task information derived from the manifest, plus per-run state.
#[derive(Debug, Clone)]
struct TaskInfo {
    name: TaskName,
    kind: StepKind,
    reload: bool,
    /// Direct dependencies for this task (names in `after = [...]`).
    deps: Vec<TaskName>,

    /// Per-run state (None if not participating in the current run).
    run_state: Option<RunState>,

    /// Last run ID in which this task succeeded.
    ///
    /// This allows watch-mode semantics like: if partials->html and only
    /// html's sources changed, html can run without re-running partials as
    /// long as partials succeeded in an earlier run.
    last_successful_run: Option<u64>,
}

impl TaskInfo {
    fn from_config(name: TaskName, cfg: &TaskConfig, deps: Vec<TaskName>) -> Self {
        // Exactly one kind is guaranteed by config::validate; a task that
        // somehow has neither becomes an inert copy of nothing.
        let kind = if let Some(cmd) = &cfg.cmd {
            StepKind::Command {
                cmd: cmd.clone(),
                fail_after_error: cfg.fail_after_error,
            }
        } else {
            StepKind::Copy(cfg.copy.clone().unwrap_or_default())
        };

        Self {
            name,
            kind,
            reload: cfg.reload,
            deps,
            run_state: None,
            last_successful_run: None,
        }
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledStep {
    pub name: TaskName,
    pub kind: StepKind,
    pub reload: bool,
}

impl ScheduledStep {
    fn from_task_info(info: &TaskInfo) -> Self {
        Self {
            name: info.name.clone(),
            kind: info.kind.clone(),
            reload: info.reload,
        }
    }
}

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a triggered task is "ready" to run (deps satisfied)
/// - marking tasks as succeeded/failed
/// - scheduling dependents when appropriate
/// - failing dependents (transitively) when a task fails
pub struct Scheduler {
    graph: TaskGraph,
    tasks: HashMap<TaskName, TaskInfo>,

    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,

    /// Whether any task failed in the current (or most recently finished) run.
    last_run_failed: bool,
    /// Whether any reload-worthy task succeeded in that run.
    last_run_wants_reload: bool,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`Manifest`].
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let graph = TaskGraph::from_manifest(manifest);

        let mut tasks = HashMap::new();
        for (name, tc) in manifest.task.iter() {
            let deps = graph.dependencies_of(name).to_vec();
            tasks.insert(name.clone(), TaskInfo::from_config(name.clone(), tc, deps));
        }

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
            last_run_failed: false,
            last_run_wants_reload: false,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Whether the current or most recently finished run had a failure.
    pub fn last_run_failed(&self) -> bool {
        self.last_run_failed
    }

    /// Whether that run completed work that a connected browser should see.
    pub fn last_run_wants_reload(&self) -> bool {
        self.last_run_wants_reload
    }

    /// Access to the underlying dependency structure.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Start a new run, resetting per-run state but keeping historical success
    /// information (for dependency satisfaction on later runs).
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.last_run_failed = false;
        self.last_run_wants_reload = false;

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Handle a watch-style trigger for a task name.
    ///
    /// The task and all its transitive dependents are pulled into the current
    /// run, so a changed stylesheet rebuilds everything downstream of the
    /// styles task. Dependencies without any success history are pulled in
    /// too; satisfied dependencies are not re-run.
    ///
    /// Returns a list of tasks that are now ready to be executed.
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledStep> {
        self.ensure_active_run();

        if self.tasks.contains_key(task) {
            self.mark_task_and_dependents_pending(task);
            self.backfill_unbuilt_dependencies();
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let ready = self.collect_new_ready_tasks();
        self.maybe_finish_run();
        ready
    }

    /// Handle a trigger that pulls in exactly one task.
    ///
    /// Used by one-shot invocations (`build` triggers every task this way;
    /// `run <task>` triggers the task's upstream closure) where downstream
    /// propagation is decided by the caller.
    pub fn handle_trigger_exact(&mut self, task: &str) -> Vec<ScheduledStep> {
        self.ensure_active_run();

        if let Some(info) = self.tasks.get_mut(task) {
            if info.run_state.is_none() {
                info.run_state = Some(RunState::Pending);
                debug!(task = %info.name, "task marked as Pending in this run");
            }
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }

        let ready = self.collect_new_ready_tasks();
        self.maybe_finish_run();
        ready
    }

    /// Handle completion of a task with a concrete outcome.
    ///
    /// - On success, we mark it as `DoneSuccess`, update historical success,
    ///   and schedule dependents where possible.
    /// - On failure, we mark it as `DoneFailed` and mark all participating
    ///   dependents in this run as `DoneFailed` as well.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledStep> {
        let run_id = match self.current_run_id {
            Some(id) => id,
            None => {
                warn!(task = %task, "handle_completion called with no active run; ignoring");
                return Vec::new();
            }
        };

        let mut newly_ready = Vec::new();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    if info.reload {
                        self.last_run_wants_reload = true;
                    }
                    debug!(task = %task, "task completed successfully");
                    newly_ready.extend(self.collect_new_ready_tasks());
                }
                TaskOutcome::Failed(code) => {
                    info.run_state = Some(RunState::DoneFailed);
                    self.last_run_failed = true;
                    warn!(
                        task = %task,
                        exit_code = code,
                        "task failed; failing dependents in this run"
                    );
                    self.mark_dependents_failed(task);
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        self.maybe_finish_run();
        newly_ready
    }

    /// All declared task names, for listings and diagnostics.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    fn ensure_active_run(&mut self) {
        if self.current_run_id.is_none() {
            // The runtime normally calls `start_new_run` first; be defensive.
            warn!("trigger with no active run; implicitly starting a new run");
            self.start_new_run();
        }
    }

    /// Mark a task and all its transitive dependents as `Pending` for this
    /// run, so downstream outputs are rebuilt from the changed input.
    fn mark_task_and_dependents_pending(&mut self, root: &str) {
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, "marked Pending for this run");
                }
                for dep_name in self.graph.dependents_of(&name) {
                    stack.push(dep_name.clone());
                }
            }
        }
    }

    /// Pull never-successful dependencies of every pending task into the run.
    ///
    /// Without this a dependent whose upstream failed in an earlier run (and
    /// so has no success history) would stay `Pending` with nothing running,
    /// and the run could never finish.
    fn backfill_unbuilt_dependencies(&mut self) {
        let mut stack: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| matches!(info.run_state, Some(RunState::Pending)))
            .map(|info| info.name.clone())
            .collect();
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            for dep_name in self.graph.dependencies_of(&name) {
                if let Some(dep) = self.tasks.get_mut(dep_name.as_str()) {
                    if dep.run_state.is_none() && dep.last_successful_run.is_none() {
                        dep.run_state = Some(RunState::Pending);
                        debug!(task = %dep_name, "never-built dependency pulled into run");
                    }
                }
                stack.push(dep_name.clone());
            }
        }
    }

    /// Determine whether all tasks are in a terminal state and clear
    /// `current_run_id` if so.
    fn maybe_finish_run(&mut self) {
        if self.current_run_id.is_none() {
            return;
        }

        let any_active = self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        });

        if !any_active {
            info!(
                run_id = self.current_run_id,
                failed = self.last_run_failed,
                "scheduler: all tasks terminal; run finished"
            );
            self.current_run_id = None;
        }
    }

    /// Collect tasks that are `Pending` with satisfied dependencies, mark them
    /// as `Running`, and return them as `ScheduledStep`s.
    fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledStep> {
        let mut ready = Vec::new();

        // Decide first, then mutate, to avoid borrowing conflicts.
        let candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter_map(|info| {
                if matches!(info.run_state, Some(RunState::Pending)) && self.deps_satisfied(info) {
                    Some(info.name.clone())
                } else {
                    None
                }
            })
            .collect();

        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                debug!(task = %info.name, "dependencies satisfied; marking Running");
                info.run_state = Some(RunState::Running);
                ready.push(ScheduledStep::from_task_info(info));
            }
        }

        ready
    }

    /// Check whether all dependencies of the given task are satisfied for the
    /// *current run*.
    ///
    /// A dependency is satisfied if:
    /// - in this run its `run_state` is `DoneSuccess`, OR
    /// - it is not part of this run (`run_state == None`) **and** it succeeded
    ///   in a previous run.
    fn deps_satisfied(&self, info: &TaskInfo) -> bool {
        for dep_name in &info.deps {
            let dep = match self.tasks.get(dep_name) {
                Some(d) => d,
                None => {
                    // Should not happen since the manifest is validated.
                    warn!(task = %info.name, dep = %dep_name, "dependency missing from tasks map");
                    return false;
                }
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) => {}
                Some(RunState::DoneFailed) => return false,
                Some(RunState::Pending) | Some(RunState::Running) => return false,
                None => {
                    if dep.last_successful_run.is_none() {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Mark all *participating* dependents (transitively) of a failed task as
    /// `DoneFailed` for this run, enforcing "failure aborts dependents".
    fn mark_dependents_failed(&mut self, failed_task: &str) {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                match info.run_state {
                    Some(RunState::Pending) | Some(RunState::Running) => {
                        info.run_state = Some(RunState::DoneFailed);
                        debug!(
                            task = %info.name,
                            "marking dependent as DoneFailed due to upstream failure"
                        );
                        stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    }
                    Some(RunState::DoneSuccess) | Some(RunState::DoneFailed) | None => {
                        // Either already terminal or not participating.
                    }
                }
            }
        }
    }
}
