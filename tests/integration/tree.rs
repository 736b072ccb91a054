#[path = "common/mod.rs"]
mod common;

use std::{process::Command, thread, time::Duration};

use procwarden::tree::ProcessTree;

#[test]
fn terminate_without_root_spares_the_root() {
    // The shell keeps looping after its background children die, so we can
    // observe that descendants were signaled while the root was not.
    let mut child = Command::new("sh")
        .arg("-c")
        .arg("sleep 300 & sleep 300 & while true; do sleep 1; done")
        .spawn()
        .unwrap();
    let root = child.id();

    let descendants = common::wait_for_children(root, 2);

    ProcessTree::terminate(root, false).unwrap();

    for pid in descendants {
        common::wait_for_process_exit(pid);
    }
    assert!(
        common::is_process_alive(root),
        "root must not be signaled when include_root is false"
    );

    ProcessTree::terminate(root, true).unwrap();
    common::wait_for_process_exit(root);
    child.wait().unwrap();
}

#[test]
fn terminate_with_root_signals_a_leaf_process() {
    let mut child = Command::new("sleep").arg("300").spawn().unwrap();
    let pid = child.id();

    // A leaf has no descendants; the children-only sweep leaves it alone.
    ProcessTree::terminate(pid, false).unwrap();
    thread::sleep(Duration::from_millis(200));
    assert!(common::is_process_alive(pid));

    ProcessTree::terminate(pid, true).unwrap();
    common::wait_for_process_exit(pid);
    child.wait().unwrap();
}

#[test]
fn terminate_tolerates_an_already_dead_target() {
    // The PID existed but has been reaped; both sweeps are clean no-ops.
    let pid = common::reaped_pid();
    ProcessTree::terminate(pid, false).unwrap();
    ProcessTree::terminate(pid, true).unwrap();
}
