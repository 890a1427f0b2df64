//! Process construction options.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::runner::{Platform, SshOptions};

/// Identifier of a pooled process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Create an id from caller-supplied text.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProcessId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ProcessId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Options describing a process to build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Command text. Its leading token selects the runner.
    pub command: String,
    /// Extra arguments appended to the command.
    pub args: Vec<String>,
    /// Runner name overriding detection. Unknown names fall back to the
    /// default runner.
    pub force_runner: Option<String>,
    /// Run on a remote host through ssh.
    pub ssh: bool,
    /// Remote host settings, used when `ssh` is set.
    pub ssh_options: Option<SshOptions>,
    /// Target platform. Defaults to the configured platform.
    pub platform: Option<Platform>,
    /// Caller-supplied identifier.
    pub id: Option<ProcessId>,
    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
}

impl ProcessOptions {
    /// Create options for a command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Set the extra arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Force a runner by name.
    #[must_use]
    pub fn force_runner(mut self, name: impl Into<String>) -> Self {
        self.force_runner = Some(name.into());
        self
    }

    /// Run on a remote host.
    #[must_use]
    pub fn ssh(mut self, options: SshOptions) -> Self {
        self.ssh = true;
        self.ssh_options = Some(options);
        self
    }

    /// Set the target platform.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<Platform>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the identifier.
    #[must_use]
    pub fn id(mut self, id: impl Into<ProcessId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Remote settings, if this process runs over ssh.
    #[must_use]
    pub fn remote(&self) -> Option<&SshOptions> {
        if self.ssh {
            self.ssh_options.as_ref()
        } else {
            None
        }
    }
}
