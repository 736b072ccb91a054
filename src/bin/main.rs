use std::{path::PathBuf, time::Duration};

use tracing::error;
use tracing_subscriber::EnvFilter;

use procwarden::{
    cli::{Cli, Commands, DaemonArgs, parse_args},
    constants::EXIT_STOP_FAILURE,
    error::SupervisorError,
    supervisor::{
        DaemonStatus, DaemonSupervisor, StartOutcome, StopOutcome, SupervisorOptions,
    },
};

fn main() {
    let args = parse_args();
    init_logging(&args);
    let quiet = args.quiet;

    match dispatch(args.command, quiet) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{err}");
            let code = match err {
                SupervisorError::StopFailure { .. } => EXIT_STOP_FAILURE,
                _ => 1,
            };
            std::process::exit(code);
        }
    }
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn dispatch(command: Commands, quiet: bool) -> Result<i32, SupervisorError> {
    match command {
        Commands::Start {
            daemon,
            log_file,
            timeout,
            poll_interval,
            command,
        } => {
            let supervisor = build_supervisor(
                daemon,
                log_file,
                Some(timeout),
                Some(poll_interval),
                quiet,
            );
            match supervisor.start(&command.join(" "))? {
                StartOutcome::Started(pid) => {
                    if !supervisor.options().quiet {
                        println!("started '{}' with PID {pid}", supervisor.name());
                    }
                }
                StartOutcome::AlreadyRunning(pid) => {
                    if !supervisor.options().quiet {
                        println!(
                            "'{}' is already running (PID {pid})",
                            supervisor.name()
                        );
                    }
                }
            }
            // The daemon outlives this invocation; the record file carries
            // ownership from here on.
            supervisor.detach();
            Ok(0)
        }
        Commands::Status { daemon } => {
            let supervisor = build_supervisor(daemon, None, None, None, quiet);
            match supervisor.status()? {
                DaemonStatus::Running(pid) => {
                    println!("{}: running (PID {pid})", supervisor.name())
                }
                DaemonStatus::Stopped => println!("{}: stopped", supervisor.name()),
            }
            Ok(0)
        }
        Commands::Stop {
            daemon,
            timeout,
            poll_interval,
        } => {
            let supervisor = build_supervisor(
                daemon,
                None,
                Some(timeout),
                Some(poll_interval),
                quiet,
            );
            match supervisor.stop()? {
                StopOutcome::Stopped => {
                    if !supervisor.options().quiet {
                        println!("stopped '{}'", supervisor.name());
                    }
                }
                StopOutcome::AlreadyStopped => {
                    if !supervisor.options().quiet {
                        println!("'{}' is not running", supervisor.name());
                    }
                }
            }
            Ok(0)
        }
        Commands::Run {
            daemon,
            log_file,
            command,
        } => {
            let supervisor = build_supervisor(daemon, log_file, None, None, quiet);
            supervisor.run(&command.join(" "))
        }
    }
}

fn build_supervisor(
    daemon: DaemonArgs,
    log_file: Option<PathBuf>,
    timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
    quiet: bool,
) -> DaemonSupervisor {
    let mut aliases = daemon.aliases;

    // Accept this binary's own name so a `run`-mode body probes as alive.
    if let Ok(exe) = std::env::current_exe()
        && let Some(name) = exe.file_name()
    {
        aliases.push(name.to_string_lossy().into_owned());
    }

    let defaults = SupervisorOptions::default();
    let options = SupervisorOptions {
        stop_timeout: timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.stop_timeout),
        poll_interval: poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval),
        aliases,
        log_file,
        quiet,
    };

    DaemonSupervisor::new(daemon.pid_file, daemon.name, options)
}
