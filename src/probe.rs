//! Liveness probing and stale-record reconciliation.

use std::{collections::HashSet, path::Path};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::{debug, warn};

use crate::{
    constants::DEFAULT_SHELL,
    error::{PidRecordError, SupervisorError},
    record::PidRecord,
};

/// Answers "is the daemon described by a PID record actually alive?".
///
/// The probe owns stale-record reconciliation: a record whose PID has exited,
/// turned into a zombie, or been recycled by an unrelated process is deleted
/// before the probe reports "not running". Callers therefore never observe a
/// stale-but-present record as evidence of liveness.
#[derive(Debug, Default, Clone)]
pub struct ProcessProbe {
    /// Alternate command names accepted for the recorded process, for
    /// daemons that execute under a linked or renamed binary.
    aliases: HashSet<String>,
}

impl ProcessProbe {
    /// Creates a probe that accepts only the recorded name itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a probe that additionally accepts any of `aliases` as the
    /// live command name.
    pub fn with_aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks whether the record at `path` refers to a live process.
    ///
    /// Absent record: false, no side effects. Malformed record: warn, delete,
    /// false. Dead or recycled PID: delete the stale record, then false.
    pub fn is_running(&self, path: &Path) -> Result<bool, SupervisorError> {
        let record = match PidRecord::read(path) {
            Ok(record) => record,
            Err(PidRecordError::NotFound) => return Ok(false),
            Err(PidRecordError::Malformed { reason, .. }) => {
                warn!("Unparsable PID record at {:?} ({reason}); removing it", path);
                PidRecord::delete(path)?;
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        };

        match Self::observed_name(record.pid) {
            Some(observed) if self.record_matches(&record, &observed) => Ok(true),
            Some(observed) => {
                warn!(
                    "PID {} now belongs to '{observed}', not '{}'; removing stale record",
                    record.pid, record.name
                );
                PidRecord::delete(path)?;
                Ok(false)
            }
            None => {
                debug!(
                    "No live process with PID {} for '{}'; removing stale record",
                    record.pid, record.name
                );
                PidRecord::delete(path)?;
                Ok(false)
            }
        }
    }

    /// Resolves the live PID behind `path`, reconciling staleness on the way.
    pub fn live_pid(&self, path: &Path) -> Result<Option<u32>, SupervisorError> {
        if self.is_running(path)? {
            match PidRecord::read(path) {
                Ok(record) => Ok(Some(record.pid)),
                // Record vanished between probe and read; the daemon exited.
                Err(PidRecordError::NotFound) => Ok(None),
                Err(err) => Err(err.into()),
            }
        } else {
            Ok(None)
        }
    }

    /// Returns the command name of the live process with `pid`, or `None` if
    /// the PID slot is empty or only a zombie occupies it.
    fn observed_name(pid: u32) -> Option<String> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let process = system.process(Pid::from_u32(pid))?;
        if matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) {
            return None;
        }

        Some(process.name().to_string_lossy().into_owned())
    }

    /// A record matches when the observed command name equals the recorded
    /// name's basename, belongs to the alias set, or is one of the names the
    /// recorded launch command implies.
    ///
    /// A record carrying its command line was launched through the shell, so
    /// the live process may report either the shell's name or the command's
    /// executable, depending on whether the shell replaced itself.
    fn record_matches(&self, record: &PidRecord, observed: &str) -> bool {
        let observed = basename(observed);
        if basename(&record.name) == observed || self.aliases.contains(observed) {
            return true;
        }

        record.command.as_deref().is_some_and(|command| {
            observed == DEFAULT_SHELL
                || command
                    .split_whitespace()
                    .next()
                    .is_some_and(|first| basename(first) == observed)
        })
    }
}

/// Strips any path prefix, since a daemon may be invoked by absolute or
/// relative path while the process table reports the bare command name.
fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
