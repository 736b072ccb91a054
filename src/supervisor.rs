//! Daemon lifecycle supervisor: start, status, stop, and run.

use std::{
    fs::OpenOptions,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tracing::{debug, error, info};

use crate::{
    constants::{
        DEFAULT_SHELL, DEFAULT_STOP_TIMEOUT, EXIT_SIGNALED, SHELL_COMMAND_FLAG,
        STOP_POLL_INTERVAL,
    },
    error::SupervisorError,
    probe::ProcessProbe,
    record::PidRecord,
    shutdown::ShutdownController,
    tree::ProcessTree,
};

/// Configuration threaded explicitly through the supervisor instead of
/// ambient process-wide state.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Grace window for stop before SIGKILL escalation.
    pub stop_timeout: Duration,
    /// Liveness poll interval during the grace window.
    pub poll_interval: Duration,
    /// Alternate command names the probe accepts for this daemon.
    pub aliases: Vec<String>,
    /// File receiving the daemon's stdout and stderr; discarded when absent.
    pub log_file: Option<PathBuf>,
    /// Suppress human-facing console output in the hosting binary.
    pub quiet: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            poll_interval: STOP_POLL_INTERVAL,
            aliases: Vec::new(),
            log_file: None,
            quiet: false,
        }
    }
}

/// Outcome of a `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A fresh daemon was launched under this PID.
    Started(u32),
    /// A live daemon already owns the record; nothing was changed.
    AlreadyRunning(u32),
}

/// Outcome of a `stop` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The daemon was terminated and its record removed.
    Stopped,
    /// No live daemon was found behind the record.
    AlreadyStopped,
}

/// Observed daemon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    /// The recorded PID is alive and matches the recorded name.
    Running(u32),
    /// No record, or the record turned out to be stale.
    Stopped,
}

/// State shared between a [`CleanupGuard`] and the signal handler.
struct CleanupState {
    /// Root of the tree to sweep.
    root: u32,
    /// Whether the root itself is signaled in addition to its descendants.
    include_root: bool,
    /// Record file removed once the tree is gone.
    pid_file: PathBuf,
    /// Cleared by the first sweep so the release runs exactly once.
    armed: AtomicBool,
}

impl CleanupState {
    /// Runs the children-first termination sweep at most once.
    fn sweep(&self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Err(err) = ProcessTree::terminate(self.root, self.include_root) {
            error!("Exit-time sweep of PID {} failed: {err}", self.root);
        }
        if let Err(err) = PidRecord::delete(&self.pid_file) {
            error!("Failed to remove PID record {:?}: {err}", self.pid_file);
        }
    }
}

/// Guards armed for the process-wide signal handler to drain.
static CLEANUPS: Mutex<Vec<Arc<CleanupState>>> = Mutex::new(Vec::new());

/// Scoped exit-time cleanup for a supervised process tree.
///
/// While armed, dropping the guard (or the process receiving SIGINT,
/// SIGTERM, or SIGHUP) terminates the supervised tree, children first, and
/// removes the PID record. Acquire is spawn plus record, release is the
/// guaranteed tree sweep on every exit path.
pub struct CleanupGuard {
    state: Arc<CleanupState>,
}

impl CleanupGuard {
    /// Arms a guard over the tree rooted at `root` and registers it with the
    /// process-wide signal handler.
    fn install(
        root: u32,
        include_root: bool,
        pid_file: &Path,
    ) -> Result<Self, SupervisorError> {
        install_signal_hook()?;

        let state = Arc::new(CleanupState {
            root,
            include_root,
            pid_file: pid_file.to_path_buf(),
            armed: AtomicBool::new(true),
        });

        CLEANUPS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::clone(&state));

        Ok(Self { state })
    }

    /// Disarms the guard, leaving the supervised tree running after exit.
    pub fn disarm(&self) {
        self.state.armed.store(false, Ordering::SeqCst);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.state.sweep();
        CLEANUPS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|entry| !Arc::ptr_eq(entry, &self.state));
    }
}

/// Registers the handler that drains armed guards when the supervising
/// process itself is signaled, so children never become unreachable orphans.
fn install_signal_hook() -> Result<(), SupervisorError> {
    match ctrlc::set_handler(|| {
        let guards = CLEANUPS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for state in guards.iter() {
            state.sweep();
        }
        std::process::exit(EXIT_SIGNALED);
    }) {
        Ok(()) => Ok(()),
        // Another supervisor in this process already installed the hook.
        Err(ctrlc::Error::MultipleHandlers) => Ok(()),
        Err(err) => Err(SupervisorError::CleanupHandler(err)),
    }
}

/// The public daemon lifecycle state machine.
///
/// A supervisor instance exclusively owns the record at its PID-file path;
/// separate invocations coordinate only through that file. The instance
/// holds the exit-time cleanup guard for any daemon it launched, so dropping
/// it reaps the daemon's tree unless [`DaemonSupervisor::detach`] handed
/// ownership over to the record file.
pub struct DaemonSupervisor {
    pid_file: PathBuf,
    name: String,
    options: SupervisorOptions,
    probe: ProcessProbe,
    shutdown: ShutdownController,
    guard: Mutex<Option<CleanupGuard>>,
}

impl DaemonSupervisor {
    /// Creates a supervisor for the daemon identified by `pid_file`/`name`.
    pub fn new(
        pid_file: impl Into<PathBuf>,
        name: impl Into<String>,
        options: SupervisorOptions,
    ) -> Self {
        let probe = ProcessProbe::with_aliases(options.aliases.iter().cloned());
        let shutdown = ShutdownController::new(options.stop_timeout, options.poll_interval);

        Self {
            pid_file: pid_file.into(),
            name: name.into(),
            options,
            probe,
            shutdown,
            guard: Mutex::new(None),
        }
    }

    /// The logical daemon name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the PID record file.
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// The configuration this supervisor was built with.
    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Launches `command` as a detached background daemon.
    ///
    /// Idempotent: when the probe already sees a live daemon, returns
    /// [`StartOutcome::AlreadyRunning`] without side effects. Otherwise the
    /// command is spawned in its own process group, its PID recorded, and
    /// the exit-time cleanup guard armed on this supervisor.
    pub fn start(&self, command: &str) -> Result<StartOutcome, SupervisorError> {
        if let Some(pid) = self.probe.live_pid(&self.pid_file)? {
            info!("'{}' is already running with PID {pid}", self.name);
            return Ok(StartOutcome::AlreadyRunning(pid));
        }

        let pid = self.spawn_detached(command)?;

        if let Err(err) = PidRecord::write(&self.pid_file, &self.name, pid, Some(command)) {
            // Lost the record race; never adopt a daemon we cannot own.
            error!("Failed to record PID {pid} for '{}': {err}", self.name);
            let _ = ProcessTree::terminate(pid, true);
            return Err(err.into());
        }

        let guard = CleanupGuard::install(pid, true, &self.pid_file)?;
        *self
            .guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(guard);

        info!("Started '{}' with PID {pid}", self.name);
        Ok(StartOutcome::Started(pid))
    }

    /// Read-only liveness query through the probe.
    pub fn status(&self) -> Result<DaemonStatus, SupervisorError> {
        match self.probe.live_pid(&self.pid_file)? {
            Some(pid) => Ok(DaemonStatus::Running(pid)),
            None => Ok(DaemonStatus::Stopped),
        }
    }

    /// Stops the daemon, escalating from SIGTERM to SIGKILL, then removes
    /// the record.
    ///
    /// Idempotent: a daemon that is not running yields
    /// [`StopOutcome::AlreadyStopped`].
    pub fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(pid) = self.probe.live_pid(&self.pid_file)? else {
            debug!("'{}' is not running; nothing to stop", self.name);
            return Ok(StopOutcome::AlreadyStopped);
        };

        self.shutdown
            .stop(pid, &self.name, &self.pid_file, &self.probe)?;
        PidRecord::delete(&self.pid_file)?;

        // The tree is gone; nothing is left for the exit-time sweep.
        self.detach();

        info!("Stopped '{}' (PID {pid})", self.name);
        Ok(StopOutcome::Stopped)
    }

    /// Turns the current process into the supervised body itself.
    ///
    /// Reconciles any stale record first, records this process's own PID,
    /// arms the exit-time cleanup, then runs `command` as an attached child
    /// and waits for it. Whether the body
    /// exits normally or is torn down by a signal, the guard sweeps any
    /// remaining children before the record disappears. Returns the child's
    /// exit code.
    pub fn run(&self, command: &str) -> Result<i32, SupervisorError> {
        let own_pid = std::process::id();
        // A record left behind by a killed supervisor heals here; a live
        // one makes the exclusive write below fail.
        self.probe.is_running(&self.pid_file)?;
        PidRecord::write(&self.pid_file, &self.name, own_pid, Some(command))?;
        let guard = CleanupGuard::install(own_pid, false, &self.pid_file)?;

        let mut child = self
            .shell_command(command)
            .stdin(Stdio::null())
            .stdout(self.daemon_stdio()?)
            .stderr(self.daemon_stdio()?)
            .spawn()
            .map_err(|source| SupervisorError::LaunchFailure {
                name: self.name.clone(),
                source,
            })?;

        debug!(
            "Supervised body '{}' (PID {own_pid}) running command under PID {}",
            self.name,
            child.id()
        );

        let status = child
            .wait()
            .map_err(|source| SupervisorError::LaunchFailure {
                name: self.name.clone(),
                source,
            })?;

        // Normal exit path: sweep stragglers and remove the record.
        drop(guard);
        Ok(status.code().unwrap_or(0))
    }

    /// Releases exit-time ownership of the daemon.
    ///
    /// After this call the record file alone tracks the daemon and the
    /// supervising process may exit without reaping it. Used by short-lived
    /// hosts (the CLI `start` command) that intend the daemon to outlive
    /// them.
    pub fn detach(&self) {
        if let Some(guard) = self
            .guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            guard.disarm();
        }
    }

    /// Builds the shell invocation for a daemon command line.
    fn shell_command(&self, command: &str) -> Command {
        let mut cmd = Command::new(DEFAULT_SHELL);
        cmd.arg(SHELL_COMMAND_FLAG).arg(command);
        cmd
    }

    /// Spawns `command` detached: own process group, stdio redirected to the
    /// configured log file or discarded.
    fn spawn_detached(&self, command: &str) -> Result<u32, SupervisorError> {
        let mut cmd = self.shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(self.daemon_stdio()?)
            .stderr(self.daemon_stdio()?);

        unsafe {
            cmd.pre_exec(|| {
                // Own process group so stop can signal the daemon's whole
                // tree without touching the supervisor's group.
                if libc::setpgid(0, 0) < 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd
            .spawn()
            .map_err(|source| SupervisorError::LaunchFailure {
                name: self.name.clone(),
                source,
            })?;

        let pid = child.id();
        debug!("Launched '{}' as PID {pid}: `{command}`", self.name);
        Ok(pid)
    }

    /// Destination for the daemon's stdout/stderr.
    fn daemon_stdio(&self) -> Result<Stdio, SupervisorError> {
        match &self.options.log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| SupervisorError::LaunchFailure {
                        name: self.name.clone(),
                        source,
                    })?;
                Ok(Stdio::from(file))
            }
            None => Ok(Stdio::null()),
        }
    }
}
