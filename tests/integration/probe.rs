#[path = "common/mod.rs"]
mod common;

use std::{fs, process::Command};

use procwarden::{probe::ProcessProbe, record::PidRecord};
use tempfile::tempdir;

#[test]
fn absent_record_reports_not_running_without_side_effects() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("absent.pid");
    let probe = ProcessProbe::new();

    assert!(!probe.is_running(&path).unwrap());
    assert!(!path.exists());
}

#[test]
fn dead_pid_heals_record_and_is_idempotent() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ghost.pid");
    let probe = ProcessProbe::new();

    PidRecord::write(&path, "true", common::reaped_pid(), None).unwrap();

    assert!(!probe.is_running(&path).unwrap());
    assert!(!path.exists(), "stale record should have been deleted");

    // Second probe is a no-op on the already-absent file.
    assert!(!probe.is_running(&path).unwrap());
}

#[test]
fn recycled_pid_with_wrong_name_is_stale() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("recycled.pid");
    let probe = ProcessProbe::new();

    // Our own PID is certainly alive, but its command name is this test
    // binary, not the recorded daemon name.
    PidRecord::write(&path, "some-old-daemon", std::process::id(), None).unwrap();

    assert!(!probe.is_running(&path).unwrap());
    assert!(!path.exists(), "recycled-PID record should have been deleted");
}

#[test]
fn live_process_with_matching_name_is_running() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("napper.pid");
    let probe = ProcessProbe::new();

    let mut child = Command::new("sleep").arg("60").spawn().unwrap();
    PidRecord::write(&path, "sleep", child.id(), None).unwrap();

    assert!(probe.is_running(&path).unwrap());
    assert_eq!(probe.live_pid(&path).unwrap(), Some(child.id()));
    assert!(path.exists());

    child.kill().unwrap();
    child.wait().unwrap();
}

#[test]
fn alias_set_matches_renamed_binary() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("napper.pid");

    let mut child = Command::new("sleep").arg("60").spawn().unwrap();
    // Recorded under a logical name that differs from the live command.
    PidRecord::write(&path, "napper", child.id(), None).unwrap();

    let strict = ProcessProbe::new();
    assert!(!strict.is_running(&path).unwrap());
    assert!(!path.exists(), "mismatch without alias should heal the record");

    PidRecord::write(&path, "napper", child.id(), None).unwrap();
    let lenient = ProcessProbe::with_aliases(["sleep"]);
    assert!(lenient.is_running(&path).unwrap());

    child.kill().unwrap();
    child.wait().unwrap();
}

#[test]
fn recorded_command_matches_without_configured_aliases() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("napper.pid");

    let mut child = Command::new("sleep").arg("60").spawn().unwrap();
    // Logical name differs from the executable; the recorded command line
    // supplies the accepted names.
    PidRecord::write(&path, "napper", child.id(), Some("sleep 60")).unwrap();

    let probe = ProcessProbe::new();
    assert!(probe.is_running(&path).unwrap());
    assert!(path.exists());

    child.kill().unwrap();
    child.wait().unwrap();
}

#[test]
fn malformed_record_heals_and_reports_not_running() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("broken.pid");
    fs::write(&path, "pid=oops\n").unwrap();

    let probe = ProcessProbe::new();
    assert!(!probe.is_running(&path).unwrap());
    assert!(!path.exists(), "malformed record should have been deleted");
}
