// src/engine/runtime.rs

use anyhow::{bail, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::engine::queue::PendingTriggers;
use crate::pipeline::scheduler::{ScheduledStep, Scheduler};

/// Public type alias for task names throughout the engine.
pub type TaskName = String;

/// Result of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32), // exit code
}

/// Events sent into the runtime from watchers, executors, or external signals.
///
/// - the CLI layer sends one `RunRequested` for `build` / `run`
/// - watchers send `TaskTriggered`
/// - the executor sends `TaskCompleted`
/// - Ctrl-C handling sends `ShutdownRequested`
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Start a run covering exactly these tasks (no dependent propagation;
    /// the caller has already decided the set).
    RunRequested { tasks: Vec<TaskName> },
    /// A watched source file changed; the task and its dependents re-run.
    TaskTriggered { task: TaskName },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}

/// Options that influence how the runtime behaves.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// If true, exit as soon as there is nothing left to run and no queued
    /// triggers. In watch mode this should be `false`.
    pub exit_when_idle: bool,
}

/// The main orchestration runtime.
///
/// Responsibilities:
/// - Consume `RuntimeEvent`s from the CLI layer, watchers, and the executor.
/// - Coalesce triggers that arrive while a run is active.
/// - Drive the task-graph scheduler.
/// - Send `ScheduledStep`s to the executor when tasks are ready.
/// - Push a reload signal to connected browsers after a clean watch-mode run.
pub struct Runtime {
    scheduler: Scheduler,
    pending: PendingTriggers,
    options: RuntimeOptions,

    /// Unified event stream from all producers.
    events_rx: mpsc::Receiver<RuntimeEvent>,

    /// Channel to the executor: ready tasks are sent here.
    exec_tx: mpsc::Sender<ScheduledStep>,

    /// Live-reload fan-out; `None` outside watch mode.
    reload_tx: Option<broadcast::Sender<()>>,

    /// Whether any run so far had a failed task (drives the exit code).
    any_failure: bool,
}

impl Runtime {
    pub fn new(
        scheduler: Scheduler,
        options: RuntimeOptions,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        exec_tx: mpsc::Sender<ScheduledStep>,
        reload_tx: Option<broadcast::Sender<()>>,
    ) -> Self {
        Self {
            scheduler,
            pending: PendingTriggers::new(),
            options,
            events_rx,
            exec_tx,
            reload_tx,
            any_failure: false,
        }
    }

    /// Main event loop.
    ///
    /// Returns an error if any task failed while `exit_when_idle` is set, so
    /// one-shot invocations exit non-zero on build failure.
    pub async fn run(mut self) -> Result<()> {
        info!("sitepipe runtime started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "runtime received event");

            let keep_running = match event {
                RuntimeEvent::RunRequested { tasks } => self.handle_run_request(tasks).await?,
                RuntimeEvent::TaskTriggered { task } => self.handle_task_trigger(task).await?,
                RuntimeEvent::TaskCompleted { task, outcome } => {
                    self.handle_task_completion(task, outcome).await?
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping runtime");
                    false
                }
            };

            if !keep_running {
                break;
            }
        }

        info!("sitepipe runtime exiting");

        if self.options.exit_when_idle && self.any_failure {
            bail!("one or more tasks failed");
        }
        Ok(())
    }

    /// Handle a one-shot run request covering an explicit task set.
    async fn handle_run_request(&mut self, tasks: Vec<TaskName>) -> Result<bool> {
        if !self.scheduler.is_idle() {
            // Only reachable if a caller requests a run mid-run; fold the
            // tasks into the pending set rather than losing them.
            warn!("run requested while a run is active; queueing tasks");
            for task in &tasks {
                self.pending.record(task);
            }
            return Ok(true);
        }

        if tasks.is_empty() {
            debug!("empty run request; nothing to do");
            return Ok(!self.options.exit_when_idle);
        }

        info!(?tasks, "starting requested run");
        self.scheduler.start_new_run();
        for task in tasks {
            let newly_ready = self.scheduler.handle_trigger_exact(&task);
            self.spawn_ready_tasks(newly_ready).await?;
        }

        Ok(true)
    }

    /// Handle a trigger from file watching.
    async fn handle_task_trigger(&mut self, task: TaskName) -> Result<bool> {
        info!(task = %task, "task triggered by file change");

        if self.scheduler.is_idle() {
            // Starting a new run; combine this trigger with anything queued
            // while the previous run was finishing.
            let mut triggers = self.pending.drain();
            if !triggers.contains(&task) {
                triggers.push(task);
            }

            self.start_watch_run(triggers).await?;
        } else {
            self.pending.record(&task);
        }

        Ok(true)
    }

    /// Handle completion of a task.
    ///
    /// Failures cause dependents to never run; that logic lives inside
    /// `Scheduler::handle_completion`.
    async fn handle_task_completion(
        &mut self,
        task: TaskName,
        outcome: TaskOutcome,
    ) -> Result<bool> {
        match outcome {
            TaskOutcome::Success => info!(task = %task, "task completed successfully"),
            TaskOutcome::Failed(code) => {
                warn!(task = %task, exit_code = code, "task failed");
            }
        }

        let newly_ready = self.scheduler.handle_completion(&task, outcome);
        self.spawn_ready_tasks(newly_ready).await?;

        if self.scheduler.is_idle() {
            self.finish_run();
            self.maybe_start_queued_run().await?;
        }

        if self.options.exit_when_idle && self.scheduler.is_idle() && self.pending.is_empty() {
            info!("runtime idle and exit_when_idle=true, stopping");
            return Ok(false);
        }

        Ok(true)
    }

    /// Bookkeeping once a run has reached a terminal state: record failures
    /// for the exit code and push a reload for clean watch-mode runs.
    fn finish_run(&mut self) {
        if self.scheduler.last_run_failed() {
            self.any_failure = true;
            return;
        }

        if self.scheduler.last_run_wants_reload() {
            if let Some(reload_tx) = &self.reload_tx {
                // No receivers just means no browser is connected.
                let receivers = reload_tx.send(()).unwrap_or(0);
                debug!(receivers, "reload signal broadcast");
            }
        }
    }

    /// Start a watch-triggered run: each trigger pulls in its dependents.
    async fn start_watch_run(&mut self, triggers: Vec<TaskName>) -> Result<()> {
        if triggers.is_empty() {
            debug!("start_watch_run called with empty trigger set; nothing to do");
            return Ok(());
        }

        info!(?triggers, "starting watch-triggered run");
        self.scheduler.start_new_run();

        for task in triggers {
            let newly_ready = self.scheduler.handle_trigger(&task);
            self.spawn_ready_tasks(newly_ready).await?;
        }

        Ok(())
    }

    /// If the scheduler is idle and there are queued triggers, start a new run.
    async fn maybe_start_queued_run(&mut self) -> Result<()> {
        if !self.scheduler.is_idle() {
            return Ok(());
        }

        let triggers = self.pending.drain();
        if triggers.is_empty() {
            return Ok(());
        }

        self.start_watch_run(triggers).await
    }

    /// Send all ready tasks to the executor.
    async fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledStep>) -> Result<()> {
        for task in tasks {
            debug!(task = %task.name, "dispatching task to executor");
            if let Err(err) = self.exec_tx.send(task).await {
                error!(error = %err, "failed to send task to executor");
                // If the executor channel is closed, there's not much we can
                // do; bubble up so higher layers can decide.
                return Err(err.into());
            }
        }
        Ok(())
    }
}
