//! Runner strategies.
//!
//! A runner decides how a command string turns into an OS invocation and may
//! clean up the output it produces. Selection is a match on the leading token
//! of the command.

mod invocation;
mod kind;
mod ssh;

pub use invocation::{Invocation, Platform};
pub use kind::RunnerKind;
pub use ssh::SshOptions;
