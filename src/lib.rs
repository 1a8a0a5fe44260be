// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod steps;
pub mod watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::info;

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::Manifest;
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::SitepipeError;
use crate::pipeline::scheduler::{ScheduledStep, Scheduler};
use crate::steps::{clean, deploy, spawn_executor, StepContext};
use crate::watch::{build_task_watch_profiles, spawn_watcher, TaskWatchSpec};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - scheduler / runtime / executor
/// - (watch mode) file watcher + dev server + Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.config);
    let manifest = load_and_validate(&manifest_path)?;
    let root = manifest_root_dir(&manifest_path);

    match args.command.unwrap_or(Command::Build) {
        Command::Build => build_project(&manifest, &root, None).await,
        Command::Run { task } => build_project(&manifest, &root, Some(&task)).await,
        Command::Watch => watch_project(&manifest, &root).await,
        Command::Clean => clean::remove_out_dir(&root.join(&manifest.build.out_dir)),
        Command::Deploy => {
            deploy::publish(
                &manifest.deploy,
                &root,
                &root.join(&manifest.build.out_dir),
            )
            .await
        }
        Command::Tasks => {
            print_tasks(&manifest);
            Ok(())
        }
    }
}

/// Run the task graph once and exit.
///
/// With `target = None` the output directory is deleted, recreated, and every
/// task runs. With a target task, the output directory is left as-is and the
/// task runs together with its transitive predecessors.
///
/// Returns an error (non-zero exit) if any task failed.
pub async fn build_project(manifest: &Manifest, root: &Path, target: Option<&str>) -> Result<()> {
    let ctx = step_context(manifest, root);

    let scheduler = Scheduler::from_manifest(manifest);

    let tasks: Vec<String> = match target {
        None => {
            clean::reset_out_dir(&ctx.out_dir)?;
            scheduler.task_names().map(|s| s.to_string()).collect()
        }
        Some(task) => {
            if !manifest.task.contains_key(task) {
                return Err(SitepipeError::TaskNotFound(task.to_string()).into());
            }
            std::fs::create_dir_all(&ctx.out_dir)?;
            scheduler.graph().upstream_closure(task)
        }
    };

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let exec_tx: mpsc::Sender<ScheduledStep> = spawn_executor(ctx, rt_tx.clone());

    rt_tx.send(RuntimeEvent::RunRequested { tasks }).await?;

    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let runtime = Runtime::new(scheduler, options, rt_rx, exec_tx, None);
    runtime.run().await
}

/// Full build, then watch sources + serve the output with live reload until
/// Ctrl-C.
async fn watch_project(manifest: &Manifest, root: &Path) -> Result<()> {
    let ctx = step_context(manifest, root);
    clean::reset_out_dir(&ctx.out_dir)?;

    let scheduler = Scheduler::from_manifest(manifest);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let exec_tx = spawn_executor(ctx.clone(), rt_tx.clone());

    // Reload fan-out to connected browsers.
    let (reload_tx, _) = broadcast::channel::<()>(16);

    // File watcher with per-task glob profiles.
    let specs: Vec<TaskWatchSpec> = manifest
        .task
        .iter()
        .map(|(name, task)| TaskWatchSpec {
            name: name.clone(),
            watch: task.watch.clone(),
            exclude: task.exclude.clone(),
        })
        .collect();
    let profiles = build_task_watch_profiles(&manifest.watch.exclude, &specs)?;

    let _watcher_handle = spawn_watcher(
        root,
        &ctx.out_dir,
        Duration::from_millis(manifest.serve.debounce_ms),
        profiles,
        rt_tx.clone(),
    )?;

    let addr = serve::spawn_server(&manifest.serve, ctx.out_dir.clone(), reload_tx.clone()).await?;
    info!("serving build output on http://{addr}/");

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Initial full build; after it the watcher takes over.
    let tasks: Vec<String> = scheduler.task_names().map(|s| s.to_string()).collect();
    rt_tx.send(RuntimeEvent::RunRequested { tasks }).await?;

    let options = RuntimeOptions {
        exit_when_idle: false,
    };
    let runtime = Runtime::new(scheduler, options, rt_rx, exec_tx, Some(reload_tx));
    runtime.run().await
}

/// Figure out the project root: directory containing the manifest, or `.`.
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn step_context(manifest: &Manifest, root: &Path) -> StepContext {
    StepContext {
        project_root: root.to_path_buf(),
        source_dir: root.join(&manifest.build.source_dir),
        out_dir: root.join(&manifest.build.out_dir),
    }
}

/// `sitepipe tasks` output: tasks, kinds, ordering and watch patterns.
fn print_tasks(manifest: &Manifest) {
    println!("tasks ({}):", manifest.task.len());
    for (name, task) in manifest.task.iter() {
        println!("  - {name}");
        if let Some(ref cmd) = task.cmd {
            println!("      cmd: {cmd}");
        }
        if let Some(ref copy) = task.copy {
            println!("      copy: {:?} -> {}/", copy.src, copy_dest_label(copy));
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.watch.is_empty() {
            println!("      watch: {:?}", task.watch);
        }
        if !task.exclude.is_empty() {
            println!("      exclude: {:?}", task.exclude);
        }
        if !task.fail_after_error {
            println!("      fail_after_error: false");
        }
    }
}

fn copy_dest_label(copy: &crate::config::model::CopySpec) -> &str {
    if copy.dest.is_empty() {
        "."
    } else {
        &copy.dest
    }
}
