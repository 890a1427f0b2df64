//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::DuplicatePolicy;
use crate::report::ReportDelimiters;
use crate::runner::Platform;

/// Pool behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// What happens when a process is pooled under a taken id.
    pub on_duplicate: DuplicatePolicy,
}

/// Defaults applied to every process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Platform used when options do not name one. Host platform if unset.
    pub default_platform: Option<Platform>,
    /// Grace period between SIGTERM and SIGKILL when cancelling, in
    /// milliseconds.
    pub terminate_timeout_ms: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            default_platform: None,
            terminate_timeout_ms: 5000,
        }
    }
}

impl ProcessConfig {
    /// Termination grace period.
    #[must_use]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }

    /// Platform for processes that do not name one.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.default_platform.clone().unwrap_or_default()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Report delimiter tokens.
    pub delimiters: ReportDelimiters,
    /// Pool settings.
    pub pool: PoolConfig,
    /// Process defaults.
    pub process: ProcessConfig,
}
