//! Recursive process-tree enumeration and signaling.

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, warn};

use crate::error::SupervisorError;

/// Signals a process and all of its transitive children.
///
/// The parent/child adjacency is computed on demand from the OS process
/// table at signal time and never cached, since process trees mutate
/// continuously.
pub struct ProcessTree;

impl ProcessTree {
    /// Terminates the tree rooted at `pid`, children first.
    ///
    /// Every descendant receives `SIGHUP`; the root itself is signaled only
    /// when `include_root` is set, so callers can separate "clean up
    /// everything under me" from "and also stop me". A node that exits
    /// between enumeration and delivery is skipped, not treated as failure.
    pub fn terminate(pid: u32, include_root: bool) -> Result<(), SupervisorError> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        Self::terminate_descendants(&system, pid)?;

        if include_root {
            Self::signal_if_alive(pid)?;
        }

        Ok(())
    }

    /// Returns the direct children of `pid` from a process-table snapshot.
    pub fn children_of(system: &System, pid: u32) -> Vec<u32> {
        system
            .processes()
            .iter()
            .filter_map(|(proc_pid, process)| {
                process
                    .parent()
                    .filter(|parent| parent.as_u32() == pid)
                    .map(|_| proc_pid.as_u32())
            })
            .collect()
    }

    /// Signals every descendant of `pid`, deepest nodes first, so no subtree
    /// outlives its own signal.
    fn terminate_descendants(system: &System, pid: u32) -> Result<(), SupervisorError> {
        for child in Self::children_of(system, pid) {
            Self::terminate_descendants(system, child)?;
            Self::signal_if_alive(child)?;
        }
        Ok(())
    }

    /// Re-verifies the process still exists, then delivers `SIGHUP`.
    fn signal_if_alive(pid: u32) -> Result<(), SupervisorError> {
        let target = Pid::from_raw(pid as i32);

        match signal::kill(target, None) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                debug!("PID {pid} exited before it could be signaled");
                return Ok(());
            }
            Err(err) => return Err(SupervisorError::SignalDelivery { pid, source: err }),
        }

        match signal::kill(target, Signal::SIGHUP) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(Errno::EPERM) => {
                // Best-effort sweep: a node we cannot signal is not ours to kill.
                warn!("Insufficient permissions to signal PID {pid}; skipping");
                Ok(())
            }
            Err(err) => Err(SupervisorError::SignalDelivery { pid, source: err }),
        }
    }
}
