//! Lifecycle tests for spawn workers.
//!
//! Each spawn runs on its own OS thread, so these tests synchronize on
//! `wait_spawn_idle` (the handoff point between the interactive command
//! source and the worker) instead of sleeping.

use vantage_runtime::{Session, SessionConfig, SpawnPhase, Value, ValueType};

fn session() -> Session {
    // Set up logging; RUST_LOG=vantage_runtime=debug shows the worker
    // lifecycle while a test runs. try_init because every test calls this.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Session::with_config(SessionConfig::default())
}

#[test]
fn test_script_runs_against_the_private_workspace() {
    let s = session();
    s.create_spawn("worker").unwrap();

    s.deposit_script("worker", "push:1\npush:2\nadd").unwrap();
    s.wait_spawn_idle("worker").unwrap();

    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(3)]
    );
    assert_eq!(
        s.spawn_workspace_render("worker").unwrap(),
        "lifo mode: [3]"
    );
    let output = s.spawn_output("worker").unwrap();
    assert_eq!(
        output,
        vec!["worker: pushed 1", "worker: pushed 2", "worker: add = 3"]
    );
}

#[test]
fn test_deposit_via_selector_line() {
    let s = session();
    s.create_spawn("worker").unwrap();

    // A compound line addressed to a spawn deposits its body as a script.
    let out = s.dispatch("@worker: push:5 push:6 add");
    assert_eq!(out, vec!["worker: script deposited"]);
    s.wait_spawn_idle("worker").unwrap();

    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(11)]
    );
}

#[test]
fn test_scripts_queue_in_deposit_order() {
    let s = session();
    s.create_spawn("worker").unwrap();

    // Back-to-back deposits: both execute, in order, nothing discarded.
    s.deposit_script("worker", "push:1").unwrap();
    s.deposit_script("worker", "push:2").unwrap();
    s.deposit_script("worker", "add").unwrap();
    s.wait_spawn_idle("worker").unwrap();

    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(3)]
    );
}

#[test]
fn test_script_touches_shared_stacks() {
    let s = session();
    s.create_stack("shared", ValueType::Int, None, None);
    s.create_spawn("worker").unwrap();

    s.deposit_script("worker", "@shared: push:42 push:8 add")
        .unwrap();
    s.wait_spawn_idle("worker").unwrap();

    assert_eq!(s.render_stack("shared").unwrap(), "lifo mode: [50]");
    // The spawn's own workspace stayed out of it.
    assert!(s.spawn_workspace_values("worker").unwrap().is_empty());
}

#[test]
fn test_failing_line_does_not_kill_the_spawn() {
    let s = session();
    s.create_spawn("worker").unwrap();

    s.deposit_script("worker", "push:1\nfrobnicate\npop\npop\npush:2")
        .unwrap();
    s.wait_spawn_idle("worker").unwrap();

    // The bad operation and the underflowing second pop were reported and
    // the rest of the script still ran.
    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(2)]
    );
    let output = s.spawn_output("worker").unwrap();
    assert!(output.contains(&"error: unknown operation `frobnicate`".to_string()));
    assert!(output.contains(&"error: stack `worker` is empty".to_string()));
    assert_eq!(output.last().unwrap(), "worker: pushed 2");

    // Still alive and waiting.
    let status = s.spawn_status("worker").unwrap();
    assert_eq!(status.phase, SpawnPhase::WaitingForScript);
}

#[test]
fn test_pause_defers_and_resume_drains() {
    let s = session();
    s.create_spawn("worker").unwrap();

    s.pause_spawn("worker").unwrap();
    s.deposit_script("worker", "push:1").unwrap();
    s.deposit_script("worker", "push:2").unwrap();

    // The pause flag is checked under the mailbox lock before any script
    // is taken, so nothing can have run.
    let status = s.spawn_status("worker").unwrap();
    assert!(status.paused);
    assert_eq!(status.pending, 2);
    assert!(s.spawn_workspace_values("worker").unwrap().is_empty());

    s.resume_spawn("worker").unwrap();
    s.wait_spawn_idle("worker").unwrap();
    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(1), Value::Int(2)]
    );
}

#[test]
fn test_stop_terminates_without_further_consumption() {
    let s = session();
    s.create_spawn("worker").unwrap();

    s.deposit_script("worker", "push:1\npush:2\nadd").unwrap();
    s.wait_spawn_idle("worker").unwrap();
    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(3)]
    );

    s.stop_spawn("worker").unwrap();
    s.wait_spawn_idle("worker").unwrap();
    assert_eq!(
        s.spawn_status("worker").unwrap().phase,
        SpawnPhase::Stopped
    );

    // A deposit after the stop is never consumed.
    s.deposit_script("worker", "push:99").unwrap();
    assert_eq!(s.spawn_status("worker").unwrap().pending, 1);
    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(3)]
    );

    // A stopped spawn still enumerates until destroyed.
    assert_eq!(s.spawn_names(), vec!["worker".to_string()]);
}

#[test]
fn test_destroy_joins_and_removes() {
    let s = session();
    s.create_spawn("worker").unwrap();
    s.deposit_script("worker", "push:1").unwrap();

    s.destroy_spawn("worker").unwrap();
    assert!(s.spawn_names().is_empty());
    assert!(s.spawn_status("worker").is_err());
    assert!(s.destroy_spawn("worker").is_err());
}

#[test]
fn test_spawn_names_are_unique() {
    let s = session();
    s.create_spawn("worker").unwrap();
    let err = s.create_spawn("worker").unwrap_err();
    assert_eq!(
        err.to_string(),
        "a spawn named `worker` already exists"
    );

    assert_eq!(s.spawn_names(), vec!["worker".to_string()]);
}

#[test]
fn test_spawn_brings_from_a_shared_stack() {
    let s = session();
    s.create_stack("rstack", ValueType::Int, None, None);
    s.dispatch("@rstack: push:104");
    s.create_spawn("worker").unwrap();

    s.deposit_script("worker", "bring(int, rstack)").unwrap();
    s.wait_spawn_idle("worker").unwrap();

    assert_eq!(
        s.spawn_workspace_values("worker").unwrap(),
        vec![Value::Int(104)]
    );
    assert_eq!(s.render_stack("rstack").unwrap(), "lifo mode: (empty)");
}

#[test]
fn test_concurrent_spawns_share_memory_cells() {
    let s = session();
    s.create_spawn("a").unwrap();
    s.create_spawn("b").unwrap();

    s.deposit_script("a", "push:7\nstore:0").unwrap();
    s.wait_spawn_idle("a").unwrap();

    s.deposit_script("b", "load:0\npush:3\nadd").unwrap();
    s.wait_spawn_idle("b").unwrap();

    assert_eq!(
        s.spawn_workspace_values("b").unwrap(),
        vec![Value::Int(10)]
    );
}

#[test]
fn test_two_spawns_interleave_on_one_stack() {
    let s = session();
    s.create_stack("shared", ValueType::Int, None, None);
    s.create_spawn("a").unwrap();
    s.create_spawn("b").unwrap();

    // Both workers hammer the same stack; per-stack locking keeps every
    // push intact, whatever the interleaving.
    let script = "@shared: push:1 push:1 push:1 push:1 push:1";
    s.deposit_script("a", script).unwrap();
    s.deposit_script("b", script).unwrap();
    s.wait_spawn_idle("a").unwrap();
    s.wait_spawn_idle("b").unwrap();

    let handle = s.stack("shared").unwrap();
    assert_eq!(handle.lock().unwrap().depth(), 10);
}
