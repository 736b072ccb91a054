//! Command-line interface for the warden binary.
use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(pub LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };
            return Ok(LogLevelArg(level));
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" | "err" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            other => return Err(format!("invalid log level '{other}'")),
        };

        Ok(LogLevelArg(level))
    }
}

/// Identity of the daemon an invocation operates on.
#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Path of the PID file identifying this daemon.
    #[arg(long, value_name = "PATH")]
    pub pid_file: PathBuf,

    /// Logical daemon name recorded alongside the PID.
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Additional command name accepted when matching the live process.
    /// May be given multiple times.
    #[arg(long = "alias", value_name = "NAME")]
    pub aliases: Vec<String>,
}

/// Command-line interface for warden.
#[derive(Parser)]
#[command(name = "warden", version, author)]
#[command(about = "Supervise a long-running command behind a PID file", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Suppress human-facing console output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for warden.
#[derive(Subcommand)]
pub enum Commands {
    /// Launch a command as a supervised background daemon.
    Start {
        #[command(flatten)]
        daemon: DaemonArgs,

        /// File receiving the daemon's stdout and stderr.
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,

        /// Grace window in seconds before SIGKILL escalation on stop.
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Liveness poll interval in seconds during the grace window.
        #[arg(long, default_value_t = 1)]
        poll_interval: u64,

        /// Command line to execute.
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Report whether the daemon is running.
    Status {
        #[command(flatten)]
        daemon: DaemonArgs,
    },

    /// Stop the daemon, escalating from SIGTERM to SIGKILL.
    Stop {
        #[command(flatten)]
        daemon: DaemonArgs,

        /// Grace window in seconds before SIGKILL escalation.
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Liveness poll interval in seconds during the grace window.
        #[arg(long, default_value_t = 1)]
        poll_interval: u64,
    },

    /// Become the supervised body itself (internal daemon mode).
    #[command(alias = "daemon")]
    Run {
        #[command(flatten)]
        daemon: DaemonArgs,

        /// File receiving the body's stdout and stderr.
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,

        /// Command line to execute.
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
