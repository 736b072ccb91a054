//! On-disk PID records binding a logical daemon name to an OS process id.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::Path,
};

use tracing::debug;

use crate::error::PidRecordError;

/// Key of the logical-name line in a record file.
const NAME_KEY: &str = "processName";

/// Key of the numeric process-id line in a record file.
const PID_KEY: &str = "pid";

/// Key of the optional launch-command line in a record file.
const COMMAND_KEY: &str = "command";

/// A PID record: the sole durable binding between a logical daemon name and
/// the OS process id last started under it.
///
/// Records are stored one per file as `key=value` lines:
///
/// ```text
/// processName=<string, no newline>
/// pid=<positive integer>
/// command=<string, optional>
/// ```
///
/// `processName` and `pid` are required; `command` preserves the launch
/// command line so later invocations can recognize the live process by its
/// executable name as well as its logical name.
///
/// A record is only meaningful while its file exists; whoever deletes the
/// file declares the daemon gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidRecord {
    /// Human-meaningful daemon name, used later to disambiguate a PID that
    /// the OS recycled for an unrelated process.
    pub name: String,
    /// Recorded OS process id.
    pub pid: u32,
    /// Command line the daemon was launched with, when known.
    pub command: Option<String>,
}

impl PidRecord {
    /// Writes a fresh record at `path`.
    ///
    /// The file is created exclusively and the full record is written in a
    /// single operation, so a concurrent reader observes either no file or a
    /// complete record, never a partial one. An existing file means another
    /// supervisor already owns this path and the write fails with
    /// [`PidRecordError::AlreadyExists`].
    pub fn write(
        path: &Path,
        name: &str,
        pid: u32,
        command: Option<&str>,
    ) -> Result<(), PidRecordError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => PidRecordError::AlreadyExists {
                    path: path.to_path_buf(),
                },
                _ => PidRecordError::Io(err),
            })?;

        let mut contents = format!("{NAME_KEY}={name}\n{PID_KEY}={pid}\n");
        if let Some(command) = command {
            // Keep the record line-oriented even for multi-line commands.
            let command = command.replace('\n', " ");
            contents.push_str(&format!("{COMMAND_KEY}={command}\n"));
        }
        file.write_all(contents.as_bytes())?;
        debug!("Recorded PID {pid} for '{name}' at {:?}", path);
        Ok(())
    }

    /// Reads the record at `path`.
    ///
    /// A missing file is the expected "not running" signal and surfaces as
    /// [`PidRecordError::NotFound`] rather than a raw I/O error.
    pub fn read(path: &Path) -> Result<Self, PidRecordError> {
        let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => PidRecordError::NotFound,
            _ => PidRecordError::Io(err),
        })?;

        Self::parse(&contents).map_err(|reason| PidRecordError::Malformed {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Removes the record at `path`. Deleting an absent record is a no-op.
    pub fn delete(path: &Path) -> Result<(), PidRecordError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PidRecordError::Io(err)),
        }
    }

    /// Parses record contents, rejecting anything short of both required
    /// fields with a valid positive pid.
    fn parse(contents: &str) -> Result<Self, String> {
        let mut name = None;
        let mut pid = None;
        let mut command = None;

        // First occurrence of each key wins; later duplicates are ignored.
        for line in contents.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key {
                NAME_KEY if name.is_none() => name = Some(value.to_string()),
                PID_KEY if pid.is_none() => pid = Some(value.to_string()),
                COMMAND_KEY if command.is_none() => command = Some(value.to_string()),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| format!("missing '{NAME_KEY}' field"))?;
        let raw_pid = pid.ok_or_else(|| format!("missing '{PID_KEY}' field"))?;
        let pid: u32 = raw_pid
            .trim()
            .parse()
            .map_err(|_| format!("non-numeric '{PID_KEY}' field: '{raw_pid}'"))?;

        if pid == 0 {
            return Err(format!("'{PID_KEY}' must be positive"));
        }

        Ok(Self { name, pid, command })
    }
}
