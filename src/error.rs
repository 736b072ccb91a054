//! Error handling for procwarden.
use std::path::PathBuf;

use thiserror::Error;

/// Error type for PID record operations.
#[derive(Debug, Error)]
pub enum PidRecordError {
    /// No record file exists at the path. This is the expected signal for
    /// "not running" and is resolved locally by callers, never logged loudly.
    #[error("no PID record found")]
    NotFound,

    /// A record already occupies the path. Overwriting it would let two
    /// supervisors each believe they own the same daemon.
    #[error("PID record already exists at {path:?}")]
    AlreadyExists {
        /// Path of the occupied record file.
        path: PathBuf,
    },

    /// The record file exists but cannot be parsed.
    #[error("malformed PID record at {path:?}: {reason}")]
    Malformed {
        /// Path of the unparsable record file.
        path: PathBuf,
        /// What the parser objected to.
        reason: String,
    },

    /// Underlying filesystem failure.
    #[error("PID record I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Defines all possible errors that can occur in the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Error reading or writing the PID record.
    #[error("PID record error: {0}")]
    Record(#[from] PidRecordError),

    /// Error spawning the daemon command.
    #[error("failed to launch '{name}': {source}")]
    LaunchFailure {
        /// The daemon name that failed to launch.
        name: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// A termination signal could not be delivered.
    #[error("failed to signal PID {pid}: {source}")]
    SignalDelivery {
        /// The target process id.
        pid: u32,
        /// The OS error reported for the delivery attempt.
        #[source]
        source: nix::errno::Errno,
    },

    /// The process survived forced termination.
    #[error("'{name}' (PID {pid}) is still alive after SIGKILL escalation")]
    StopFailure {
        /// The daemon name that could not be stopped.
        name: String,
        /// The process id that refused to die.
        pid: u32,
    },

    /// Error registering the exit-time cleanup handler.
    #[error("failed to register cleanup handler: {0}")]
    CleanupHandler(#[from] ctrlc::Error),

    /// Raw OS error from the process table.
    #[error("process table error: {0}")]
    Errno(#[from] nix::errno::Errno),
}
