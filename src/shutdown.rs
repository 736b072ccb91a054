//! Graceful-then-forceful shutdown escalation.

use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tracing::{debug, info, warn};

use crate::{
    constants::{
        DEFAULT_STOP_TIMEOUT, KILL_CONFIRM_CHECKS, KILL_CONFIRM_INTERVAL,
        STOP_POLL_INTERVAL,
    },
    error::SupervisorError,
    probe::ProcessProbe,
};

/// Phases of a single stop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Graceful SIGTERM delivered.
    Signaled,
    /// Grace window still open, process still alive.
    Waiting,
    /// Grace window expired, SIGKILL delivered.
    Escalated,
    /// The probe no longer sees the process.
    Confirmed,
}

/// Orchestrates TERM-then-KILL termination with a bounded wait.
///
/// The graceful signal gives a cooperating process a bounded window to flush
/// state and exit on its own before it is unconditionally destroyed.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_TIMEOUT, STOP_POLL_INTERVAL)
    }
}

impl ShutdownController {
    /// Creates a controller with an explicit grace window and poll interval.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Stops the process recorded at `pid_file`.
    ///
    /// Sends SIGTERM, polls the probe once per interval until the grace
    /// window closes, then escalates to SIGKILL. Failure to deliver the
    /// initial signal (e.g. permission denied) fails fast rather than
    /// waiting out the timeout; an expired grace window is only a warning,
    /// since escalation recovers it.
    pub fn stop(
        &self,
        pid: u32,
        name: &str,
        pid_file: &Path,
        probe: &ProcessProbe,
    ) -> Result<(), SupervisorError> {
        Self::deliver(pid, Signal::SIGTERM)
            .map_err(|source| SupervisorError::SignalDelivery { pid, source })?;

        let mut phase = ShutdownPhase::Signaled;
        debug!("Stopping '{name}' (PID {pid}): {phase:?}");

        let deadline = Instant::now() + self.timeout;
        while Instant::now() < deadline {
            if !probe.is_running(pid_file)? {
                phase = ShutdownPhase::Confirmed;
                debug!("Stopping '{name}' (PID {pid}): {phase:?}");
                info!("'{name}' (PID {pid}) exited within the grace window");
                return Ok(());
            }

            if phase != ShutdownPhase::Waiting {
                phase = ShutdownPhase::Waiting;
                debug!("Stopping '{name}' (PID {pid}): {phase:?}");
            }
            thread::sleep(self.poll_interval);
        }

        warn!(
            "'{name}' (PID {pid}) did not exit within {:?}; escalating to SIGKILL",
            self.timeout
        );
        phase = ShutdownPhase::Escalated;
        debug!("Stopping '{name}' (PID {pid}): {phase:?}");
        Self::deliver(pid, Signal::SIGKILL)
            .map_err(|source| SupervisorError::SignalDelivery { pid, source })?;

        for _ in 0..KILL_CONFIRM_CHECKS {
            if !probe.is_running(pid_file)? {
                phase = ShutdownPhase::Confirmed;
                debug!("Stopping '{name}' (PID {pid}): {phase:?}");
                return Ok(());
            }
            thread::sleep(KILL_CONFIRM_INTERVAL);
        }

        Err(SupervisorError::StopFailure {
            name: name.to_string(),
            pid,
        })
    }

    /// Delivers `sig` to the target, covering its whole process group when
    /// the target leads a group of its own.
    ///
    /// A target that is already gone (`ESRCH`) is not an error; the probe
    /// loop confirms its absence.
    fn deliver(pid: u32, sig: Signal) -> Result<(), Errno> {
        let target = Pid::from_raw(pid as i32);

        let own_group = unsafe { libc::getpgid(0) };
        let target_group = unsafe { libc::getpgid(target.as_raw()) };
        if target_group >= 0 && target_group != own_group {
            match signal::killpg(Pid::from_raw(target_group), sig) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(Errno::EPERM) => {
                    warn!(
                        "Insufficient permissions to signal process group {target_group}; \
                         falling back to direct signal"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        match signal::kill(target, sig) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
