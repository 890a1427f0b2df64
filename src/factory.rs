//! Building pooled processes from options.

use crate::config::RunnerConfig;
use crate::pool::{PoolError, ProcessPool};
use crate::process::{Process, ProcessId, ProcessOptions};
use crate::runner::RunnerKind;

/// Error type for process construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    /// The command text is empty or whitespace only.
    #[error("Cannot build a process without a command")]
    EmptyCommand,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Resolves options into processes and registers them in a pool.
#[derive(Debug, Clone)]
pub struct ProcessFactory {
    pool: ProcessPool,
    config: RunnerConfig,
}

impl ProcessFactory {
    /// Create a factory registering into `pool`.
    #[must_use]
    pub fn new(pool: ProcessPool, config: RunnerConfig) -> Self {
        Self { pool, config }
    }

    /// Create a factory with a fresh pool built from the configured policy.
    #[must_use]
    pub fn from_config(config: RunnerConfig) -> Self {
        let pool = ProcessPool::with_policy(config.pool.on_duplicate);
        Self::new(pool, config)
    }

    /// Pool the factory registers into.
    #[must_use]
    pub fn pool(&self) -> &ProcessPool {
        &self.pool
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Build an idle process and register it in the pool.
    ///
    /// The id is `id` if given, then `options.id`, then a generated one.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError::EmptyCommand` for a blank command and
    /// `FactoryError::Pool` if the pool refuses the id. Nothing is registered
    /// on error.
    pub fn make(
        &self,
        mut options: ProcessOptions,
        id: Option<ProcessId>,
    ) -> Result<Process, FactoryError> {
        if options.command.trim().is_empty() {
            return Err(FactoryError::EmptyCommand);
        }

        let runner = self.resolve_runner(&options);
        let id = id
            .or_else(|| options.id.take())
            .unwrap_or_else(ProcessId::generate);
        if options.platform.is_none() {
            options.platform = Some(self.config.process.platform());
        }

        let mut process = Process::new(
            id,
            runner,
            options,
            self.config.delimiters.clone(),
        )
        .with_terminate_timeout(self.config.process.terminate_timeout());

        self.pool.add(process.handle())?;
        process.attach_pool(self.pool.clone());

        tracing::debug!(
            process_id = %process.id(),
            runner = %runner,
            platform = %process.platform(),
            "Built process"
        );
        Ok(process)
    }

    fn resolve_runner(&self, options: &ProcessOptions) -> RunnerKind {
        match options.force_runner.as_deref() {
            Some(name) => RunnerKind::from_name(name).unwrap_or_else(|| {
                tracing::debug!(runner = name, "Unknown forced runner, using default");
                RunnerKind::Default
            }),
            None => RunnerKind::detect(&options.command),
        }
    }
}

impl Default for ProcessFactory {
    fn default() -> Self {
        Self::from_config(RunnerConfig::default())
    }
}
