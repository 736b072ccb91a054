#[path = "common/mod.rs"]
mod common;

use std::{
    process::Command,
    time::{Duration, Instant},
};

use procwarden::{probe::ProcessProbe, record::PidRecord, shutdown::ShutdownController};
use tempfile::tempdir;

#[test]
fn cooperative_process_exits_within_the_grace_window() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("napper.pid");

    let mut child = Command::new("sleep").arg("300").spawn().unwrap();
    PidRecord::write(&path, "sleep", child.id(), None).unwrap();

    let controller =
        ShutdownController::new(Duration::from_secs(5), Duration::from_millis(100));
    let probe = ProcessProbe::new();

    let started = Instant::now();
    controller.stop(child.id(), "sleep", &path, &probe).unwrap();

    // sleep dies on the first SIGTERM; no escalation, no full grace wait.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!common::is_process_alive(child.id()));

    child.wait().unwrap();
}

#[test]
fn already_dead_target_confirms_immediately() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ghost.pid");

    let pid = common::reaped_pid();
    PidRecord::write(&path, "true", pid, None).unwrap();

    let controller =
        ShutdownController::new(Duration::from_secs(5), Duration::from_millis(100));
    controller.stop(pid, "true", &path, &ProcessProbe::new()).unwrap();
}

#[test]
fn term_resistant_process_is_escalated_to_kill() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("stubborn.pid");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg("trap '' TERM; while true; do sleep 1; done")
        .spawn()
        .unwrap();
    let pid = child.id();
    PidRecord::write(&path, "sh", pid, None).unwrap();

    let timeout = Duration::from_secs(1);
    let controller = ShutdownController::new(timeout, Duration::from_millis(200));
    let probe = ProcessProbe::new();

    let started = Instant::now();
    controller.stop(pid, "sh", &path, &probe).unwrap();

    // SIGTERM was trapped, so the full grace window elapsed before SIGKILL.
    assert!(started.elapsed() >= timeout);
    assert!(!common::is_process_alive(pid));

    child.wait().unwrap();
}
