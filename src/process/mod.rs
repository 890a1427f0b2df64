//! Processes: options, lifecycle, report notifications and spawning.

mod error;
mod events;
mod handle;
mod lifecycle;
mod options;
mod spawn;
mod state;

pub use error::{ProcessError, SpawnError};
pub use events::{ProcessEvent, ReportEvent};
pub use handle::ProcessHandle;
pub use lifecycle::{Process, DEFAULT_TERMINATE_TIMEOUT};
pub use options::{ProcessId, ProcessOptions};
pub use spawn::{ProcessSummary, RunningProcess, READ_BUFFER_SIZE, SIGNAL_EXIT_CODE};
pub use state::ProcessState;
