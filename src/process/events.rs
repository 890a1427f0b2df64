//! Notifications broadcast to process subscribers.

use serde::Serialize;

use crate::report::{Report, ReportParseError};

use super::ProcessId;

/// A report emitted by a process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEvent {
    /// Process that emitted the report.
    pub process_id: ProcessId,
    /// Decoded report.
    pub report: Report,
}

/// Events delivered to subscribers, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A report was fully received and decoded.
    Report(ReportEvent),
    /// A report was fully received but its body is not valid JSON.
    InvalidReport {
        process_id: ProcessId,
        error: ReportParseError,
    },
    /// The process exited normally.
    Closed {
        process_id: ProcessId,
        exit_code: i32,
    },
    /// The process exited abnormally with a report left open, or failed to
    /// start.
    Errored {
        process_id: ProcessId,
        exit_code: Option<i32>,
        message: String,
    },
}

impl ProcessEvent {
    /// Process this event belongs to.
    #[must_use]
    pub fn process_id(&self) -> &ProcessId {
        match self {
            Self::Report(event) => &event.process_id,
            Self::InvalidReport { process_id, .. }
            | Self::Closed { process_id, .. }
            | Self::Errored { process_id, .. } => process_id,
        }
    }

    /// Returns the report if this is a `Report` event.
    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Report(event) => Some(&event.report),
            _ => None,
        }
    }

    /// Returns true for the final event of a process.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Errored { .. })
    }
}
