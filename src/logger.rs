// Progress log - append-only audit trail of a run
//
// Every stage writes "<timestamp> : <message>" lines here and mirrors them to tracing.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::EtlError;

/// Year-Monthname-Day-Hour:Minute:Second
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

const SEPARATOR: &str = " : ";

/// One line of the progress log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    /// Parse a "<timestamp> : <message>" line
    pub fn parse(line: &str) -> Option<LogEntry> {
        let (timestamp, message) = line.split_once(SEPARATOR)?;
        Some(LogEntry {
            timestamp: timestamp.to_string(),
            message: message.to_string(),
        })
    }
}

/// Handle to the log file shared by every stage of a run
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProgressLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log (or create it). Called once at the start of a run.
    pub fn clear(&self) -> Result<(), EtlError> {
        File::create(&self.path).map_err(|source| EtlError::Log {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Append a progress line
    pub fn log_progress(&self, message: &str) -> Result<(), EtlError> {
        tracing::info!("{}", message);
        self.append(message)
    }

    /// Append a failure line
    pub fn log_failure(&self, message: &str) -> Result<(), EtlError> {
        tracing::error!("{}", message);
        self.append(message)
    }

    /// Log "<what> failed: <cause>" and hand the error back for propagation.
    ///
    /// If the log itself can't be written, that error wins: a run without an
    /// audit trail is not allowed to continue.
    pub fn failed(&self, what: &str, err: EtlError) -> EtlError {
        match self.log_failure(&format!("{} failed: {}", what, err)) {
            Ok(()) => err,
            Err(log_err) => log_err,
        }
    }

    fn append(&self, message: &str) -> Result<(), EtlError> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| EtlError::Log {
                path: self.path.clone(),
                source,
            })?;

        writeln!(file, "{}{}{}", timestamp, SEPARATOR, message).map_err(|source| {
            EtlError::Log {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Raw log contents
    pub fn contents(&self) -> Result<String, EtlError> {
        fs::read_to_string(&self.path).map_err(|source| EtlError::io(&self.path, source))
    }

    /// Every well-formed line of the log, in append order
    pub fn read_entries(&self) -> Result<Vec<LogEntry>, EtlError> {
        Ok(self.contents()?.lines().filter_map(LogEntry::parse).collect())
    }
}
