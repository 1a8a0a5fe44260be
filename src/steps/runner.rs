// src/steps/runner.rs

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::pipeline::scheduler::{ScheduledStep, StepKind};
use crate::steps::copy::run_copy;

/// Directory layout handed to every step.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Project root; `cmd` tasks run with this as their working directory.
    pub project_root: PathBuf,
    /// Root of the source tree, resolved against the project root.
    pub source_dir: PathBuf,
    /// Root of the build output tree, resolved against the project root.
    pub out_dir: PathBuf,
}

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledStep>` is what the runtime uses as
/// `exec_tx`. Each scheduled step runs in its own Tokio task, so a parallel
/// group genuinely overlaps.
pub fn spawn_executor(
    ctx: StepContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledStep> {
    let (tx, mut rx) = mpsc::channel::<ScheduledStep>(32);
    let ctx = Arc::new(ctx);

    tokio::spawn(async move {
        info!("executor loop started");
        while let Some(step) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                run_step(step, ctx, runtime_tx).await;
            });
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Run a single step and emit a `TaskCompleted` event.
///
/// Internal errors (spawn failure, channel trouble) are converted into a
/// failed completion with exit code -1 and logged via `tracing::error!`.
async fn run_step(step: ScheduledStep, ctx: Arc<StepContext>, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let task_name = step.name.clone();
    if let Err(err) = run_step_inner(step, &ctx, &runtime_tx).await {
        error!(task = %task_name, error = %err, "step execution error");
        let _ = runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                task: task_name,
                outcome: TaskOutcome::Failed(-1),
            })
            .await;
    }
}

async fn run_step_inner(
    step: ScheduledStep,
    ctx: &StepContext,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<()> {
    let outcome = match &step.kind {
        StepKind::Command {
            cmd,
            fail_after_error,
        } => run_command(&step.name, cmd, *fail_after_error, ctx).await?,
        StepKind::Copy(spec) => {
            let source_dir = ctx.source_dir.clone();
            let out_dir = ctx.out_dir.clone();
            let spec = spec.clone();
            let name = step.name.clone();

            // Plain blocking fs work; keep it off the async threads.
            let result =
                tokio::task::spawn_blocking(move || run_copy(&source_dir, &out_dir, &spec))
                    .await
                    .context("copy step panicked")?;

            match result {
                Ok(count) => {
                    info!(task = %name, files = count, "copy step finished");
                    TaskOutcome::Success
                }
                Err(err) => {
                    warn!(task = %name, error = %err, "copy step failed");
                    TaskOutcome::Failed(1)
                }
            }
        }
    };

    runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: step.name.clone(),
            outcome,
        })
        .await
        .with_context(|| format!("sending TaskCompleted event for task '{}'", step.name))?;

    Ok(())
}

/// Run an external transformation tool via the platform shell, streaming its
/// output into the logs.
async fn run_command(
    task_name: &str,
    cmd: &str,
    fail_after_error: bool,
    ctx: &StepContext,
) -> Result<TaskOutcome> {
    info!(task = %task_name, cmd = %cmd, "starting task process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .current_dir(&ctx.project_root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{task_name}'"))?;

    // Stream stdout at debug; always consume so buffers don't fill.
    if let Some(stdout) = child.stdout.take() {
        let name = task_name.to_string();
        tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %name, "stdout: {}", line);
            }
        });
    }

    // Tool errors arrive on stderr; surface them at warn so a failing
    // compile is visible without -v.
    if let Some(stderr) = child.stderr.take() {
        let name = task_name.to_string();
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(task = %name, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{task_name}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task_name,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    if status.success() {
        Ok(TaskOutcome::Success)
    } else if !fail_after_error {
        // Lint-style step: report, but don't fail the build.
        warn!(
            task = %task_name,
            exit_code = code,
            "task exited non-zero but fail_after_error = false; treating as success"
        );
        Ok(TaskOutcome::Success)
    } else {
        Ok(TaskOutcome::Failed(code))
    }
}
