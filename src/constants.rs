//! Fixed timing, shell, and exit-code values for the supervisor.

use std::time::Duration;

/// Grace window granted to a daemon between SIGTERM and SIGKILL.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between liveness polls while the grace window is open.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Number of confirmation checks performed after SIGKILL escalation.
pub const KILL_CONFIRM_CHECKS: usize = 10;

/// Delay between post-SIGKILL confirmation checks.
pub const KILL_CONFIRM_INTERVAL: Duration = Duration::from_millis(100);

/// Shell used to execute daemon command lines.
pub const DEFAULT_SHELL: &str = "sh";

/// Shell argument flag for executing command strings.
pub const SHELL_COMMAND_FLAG: &str = "-c";

/// Exit code reported when a daemon survives even SIGKILL escalation.
pub const EXIT_STOP_FAILURE: i32 = 3;

/// Exit code reported when an external signal triggers the exit-time sweep.
/// The signal handler does not learn which signal fired, so the SIGINT
/// convention (128 + 2) stands in for all of them.
pub const EXIT_SIGNALED: i32 = 130;
