//! Procwarden turns an arbitrary long-running command into a supervised
//! background daemon identified by a PID file. It provides start, status,
//! stop, and run actions, recursive child-process termination, and a
//! graceful-then-forceful shutdown escalation with a bounded grace window.

/// CLI interface.
pub mod cli;

/// Timing, shell, and exit-code constants.
pub mod constants;

/// Error handling.
pub mod error;

/// Liveness probing and stale-record reconciliation.
pub mod probe;

/// On-disk PID records.
pub mod record;

/// Graceful-then-forceful shutdown escalation.
pub mod shutdown;

/// Daemon lifecycle supervisor.
pub mod supervisor;

/// Process-tree enumeration and signaling.
pub mod tree;
