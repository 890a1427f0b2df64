//! Process error types.

use crate::report::ReportParseError;

/// Error type for process spawning.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The program was not found.
    #[error("Program not found: {0}")]
    NotFound(String),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Errors raised by a process.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The process exited with a non-zero code while a report was open. The
    /// message is the recorded stray output, including the partial report.
    #[error("{message}")]
    Interrupted { exit_code: i32, message: String },

    /// A closed report could not be decoded.
    #[error(transparent)]
    Report(#[from] ReportParseError),

    /// The process could not be started.
    #[error("Failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// `spawn` was called on a process that already started.
    #[error("Process already started")]
    AlreadyStarted,

    /// Output was delivered after the process closed.
    #[error("Process already closed")]
    AlreadyClosed,

    /// Process stdout was not available.
    #[error("Process stdout not available")]
    NoStdout,

    /// I/O error while waiting on the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The driver task panicked or was aborted.
    #[error("Process task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
