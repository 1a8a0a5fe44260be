use std::collections::BTreeMap;
use std::error::Error;

use sitepipe::config::model::{Manifest, TaskConfig};
use sitepipe::engine::TaskOutcome;
use sitepipe::pipeline::Scheduler;

type TestResult = Result<(), Box<dyn Error>>;

fn task(cmd: &str, after: &[&str], reload: bool) -> TaskConfig {
    TaskConfig {
        cmd: Some(cmd.to_string()),
        copy: None,
        after: after.iter().map(|s| s.to_string()).collect(),
        watch: vec![],
        exclude: vec![],
        fail_after_error: true,
        reload,
    }
}

/// partials -> html -> minify chain plus an independent styles task.
fn chain_manifest() -> Manifest {
    let mut tasks = BTreeMap::new();
    tasks.insert("partials".into(), task("echo partials", &[], true));
    tasks.insert("html".into(), task("echo html", &["partials"], true));
    tasks.insert("minify".into(), task("echo minify", &["html"], true));
    tasks.insert("styles".into(), task("echo styles", &[], true));

    Manifest {
        build: Default::default(),
        serve: Default::default(),
        deploy: Default::default(),
        watch: Default::default(),
        task: tasks,
    }
}

#[test]
fn failure_blocks_dependents_transitively() -> TestResult {
    let mut scheduler = Scheduler::from_manifest(&chain_manifest());

    scheduler.start_new_run();
    for name in ["partials", "html", "minify", "styles"] {
        scheduler.handle_trigger_exact(name);
    }

    // partials fails: html and minify must never be dispatched.
    let ready = scheduler.handle_completion("partials", TaskOutcome::Failed(2));
    assert!(ready.is_empty());
    assert!(scheduler.last_run_failed());

    // The independent styles task still finishes the run normally.
    assert!(!scheduler.is_idle());
    let ready = scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(ready.is_empty());
    assert!(scheduler.is_idle());
    assert!(scheduler.last_run_failed());
    Ok(())
}

#[test]
fn mid_chain_failure_spares_completed_upstream() -> TestResult {
    let mut scheduler = Scheduler::from_manifest(&chain_manifest());

    scheduler.start_new_run();
    for name in ["partials", "html", "minify"] {
        scheduler.handle_trigger_exact(name);
    }

    scheduler.handle_completion("partials", TaskOutcome::Success);
    let ready = scheduler.handle_completion("html", TaskOutcome::Failed(1));
    assert!(ready.is_empty());
    assert!(scheduler.is_idle());
    assert!(scheduler.last_run_failed());

    // Next watch run can still lean on partials' recorded success.
    scheduler.start_new_run();
    let ready = scheduler.handle_trigger("html");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "html");
    Ok(())
}

#[test]
fn downstream_trigger_revives_failed_upstream() -> TestResult {
    let mut scheduler = Scheduler::from_manifest(&chain_manifest());

    // Initial build: partials fails, blocking the chain; styles succeeds.
    scheduler.start_new_run();
    for name in ["partials", "html", "minify", "styles"] {
        scheduler.handle_trigger_exact(name);
    }
    scheduler.handle_completion("partials", TaskOutcome::Failed(1));
    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());
    assert!(scheduler.last_run_failed());

    // An html-only change cannot lean on partials (no success history), so
    // partials is pulled into the run and dispatched first instead of the
    // run stalling with nothing running.
    scheduler.start_new_run();
    let ready = scheduler.handle_trigger("html");
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "partials");

    let ready = scheduler.handle_completion("partials", TaskOutcome::Success);
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "html");

    let ready = scheduler.handle_completion("html", TaskOutcome::Success);
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "minify");

    scheduler.handle_completion("minify", TaskOutcome::Success);
    assert!(scheduler.is_idle());
    assert!(!scheduler.last_run_failed());
    Ok(())
}

#[test]
fn clean_run_wants_reload_failed_run_does_not() -> TestResult {
    let mut scheduler = Scheduler::from_manifest(&chain_manifest());

    scheduler.start_new_run();
    scheduler.handle_trigger_exact("styles");
    scheduler.handle_completion("styles", TaskOutcome::Success);
    assert!(scheduler.is_idle());
    assert!(scheduler.last_run_wants_reload());

    scheduler.start_new_run();
    scheduler.handle_trigger_exact("styles");
    scheduler.handle_completion("styles", TaskOutcome::Failed(1));
    assert!(scheduler.is_idle());
    assert!(!scheduler.last_run_wants_reload());
    assert!(scheduler.last_run_failed());
    Ok(())
}

#[test]
fn reload_flag_respected_per_task() -> TestResult {
    let mut tasks = BTreeMap::new();
    tasks.insert("lint".into(), task("eslint .", &[], false));
    let manifest = Manifest {
        build: Default::default(),
        serve: Default::default(),
        deploy: Default::default(),
        watch: Default::default(),
        task: tasks,
    };

    let mut scheduler = Scheduler::from_manifest(&manifest);
    scheduler.start_new_run();
    scheduler.handle_trigger_exact("lint");
    scheduler.handle_completion("lint", TaskOutcome::Success);

    // A lint-only run has nothing a browser needs to see.
    assert!(scheduler.is_idle());
    assert!(!scheduler.last_run_wants_reload());
    Ok(())
}
