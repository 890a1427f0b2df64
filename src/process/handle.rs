//! Shared back-references to processes.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::runner::RunnerKind;

use super::{ProcessId, ProcessState};

/// Cheap, clonable reference to a process, as stored in the pool.
///
/// A handle does not own the process: it observes its lifecycle state and
/// can request cancellation. The process itself is owned by whoever drives
/// it.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: ProcessId,
    command: String,
    runner: RunnerKind,
    created_at: DateTime<Utc>,
    state: watch::Receiver<ProcessState>,
    cancel: CancellationToken,
}

impl ProcessHandle {
    pub(crate) fn new(
        id: ProcessId,
        command: String,
        runner: RunnerKind,
        created_at: DateTime<Utc>,
        state: watch::Receiver<ProcessState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            command,
            runner,
            created_at,
            state,
            cancel,
        }
    }

    /// Process identifier.
    #[must_use]
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Command text the process was built from.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Runner executing the process.
    #[must_use]
    pub fn runner(&self) -> RunnerKind {
        self.runner
    }

    /// When the process was built.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// Request termination of the underlying OS process.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true if both handles refer to the same process instance.
    #[must_use]
    pub fn same_process(&self, other: &Self) -> bool {
        self.state.same_channel(&other.state)
    }

    /// Wait until the process reaches a terminal state.
    ///
    /// Returns the last known state if the process is dropped first.
    pub async fn closed(&self) -> ProcessState {
        let mut state = self.state.clone();
        if let Ok(s) = state.wait_for(|s| s.is_terminal()).await {
            return *s;
        }
        let last = *state.borrow();
        last
    }
}
