#![allow(dead_code)]

use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

/// True while `pid` exists and is not a zombie awaiting reaping.
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some_and(|process| {
        !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
    })
}

/// Direct non-zombie children of `pid`.
pub fn live_children(pid: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    system
        .processes()
        .iter()
        .filter(|(_, process)| {
            process.parent().is_some_and(|parent| parent.as_u32() == pid)
                && !matches!(
                    process.status(),
                    ProcessStatus::Zombie | ProcessStatus::Dead
                )
        })
        .map(|(proc_pid, _)| proc_pid.as_u32())
        .collect()
}

/// All live descendants of `pid` as `(pid, command name)` pairs.
pub fn descendants_of(pid: u32) -> Vec<(u32, String)> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut found = Vec::new();
    let mut frontier = vec![pid];
    while let Some(current) = frontier.pop() {
        for (proc_pid, process) in system.processes() {
            if process.parent().is_some_and(|parent| parent.as_u32() == current)
                && !matches!(
                    process.status(),
                    ProcessStatus::Zombie | ProcessStatus::Dead
                )
            {
                let child = proc_pid.as_u32();
                found.push((child, process.name().to_string_lossy().into_owned()));
                frontier.push(child);
            }
        }
    }
    found
}

pub fn wait_for_process_exit(pid: u32) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if !is_process_alive(pid) {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for PID {pid} to exit");
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}

pub fn wait_for_path_removed(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if !path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Timed out waiting for {:?} to disappear", path);
}

/// Waits until `pid` has at least `expected` live children and returns them.
pub fn wait_for_children(pid: u32, expected: usize) -> Vec<u32> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let children = live_children(pid);
        if children.len() >= expected {
            return children;
        }

        if Instant::now() >= deadline {
            panic!(
                "Timed out waiting for {expected} children of PID {pid} (saw {:?})",
                children
            );
        }

        thread::sleep(Duration::from_millis(100));
    }
}

/// Spawns a short-lived process and reaps it, yielding a PID that is
/// guaranteed to be dead (and very unlikely to be recycled mid-test).
pub fn reaped_pid() -> u32 {
    let mut child = std::process::Command::new("true")
        .spawn()
        .expect("failed to spawn 'true'");
    let pid = child.id();
    child.wait().expect("failed to reap 'true'");
    pid
}
