// src/watch/watcher.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::patterns::TaskWatchProfile;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher observing `root` recursively that sends
/// `RuntimeEvent::TaskTriggered` for tasks whose patterns match a changed
/// path.
///
/// - `root` is the project root against which all glob patterns are evaluated.
/// - `out_dir` is excluded entirely, so writing build output never re-triggers
///   a build.
/// - Matched triggers are held for a `debounce` quiet window before being
///   flushed, coalescing editor save bursts into one run.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    out_dir: &Path,
    debounce: Duration,
    profiles: Vec<TaskWatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone()); // best-effort

    let out_prefix = out_dir
        .canonicalize()
        .unwrap_or_else(|_| out_dir.to_path_buf());

    let profiles = Arc::new(profiles);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // tracing isn't usable from this thread; fall back to stderr.
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("sitepipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    // Async task that consumes notify events, debounces them, and forwards
    // task triggers to the runtime.
    let async_root = root.clone();
    let async_profiles = Arc::clone(&profiles);
    tokio::spawn(async move {
        let mut pending: HashSet<String> = HashSet::new();

        loop {
            let quiet = tokio::time::sleep(debounce);
            tokio::pin!(quiet);

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    debug!("received notify event: {:?}", event);
                    collect_triggers(
                        &event,
                        &async_root,
                        &out_prefix,
                        &async_profiles,
                        &mut pending,
                    );
                }
                _ = &mut quiet, if !pending.is_empty() => {
                    for task in pending.drain() {
                        debug!(task = %task, "debounce window elapsed; triggering task");
                        if let Err(err) = runtime_tx
                            .send(RuntimeEvent::TaskTriggered { task })
                            .await
                        {
                            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
                            // Runtime channel closed; no point keeping the
                            // watcher loop alive.
                            return;
                        }
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Map one notify event to the set of tasks interested in its paths.
fn collect_triggers(
    event: &Event,
    root: &Path,
    out_prefix: &Path,
    profiles: &[TaskWatchProfile],
    pending: &mut HashSet<String>,
) {
    for path in &event.paths {
        if path.starts_with(out_prefix) {
            // Build output; ignoring it prevents rebuild loops.
            continue;
        }

        let Some(rel_str) = relative_str(root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            continue;
        };

        for profile in profiles {
            if profile.matches(&rel_str) {
                debug!(task = %profile.name(), path = %rel_str, "watch match");
                pending.insert(profile.name().to_string());
            }
        }
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root` and cannot be relativized.
fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s)
}
