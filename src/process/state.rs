//! Process lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle of a process: `Idle -> Running -> Closed`, or `Errored`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    #[default]
    Idle,
    Running,
    Closed,
    Errored,
}

impl ProcessState {
    /// Returns true once the process can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}
