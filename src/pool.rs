//! Registry of live processes.
//!
//! The pool maps identifiers to [`ProcessHandle`]s. It is a lookup and
//! cancellation index, not an owner: processes are driven elsewhere and
//! remove themselves when they close.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::process::{ProcessHandle, ProcessId};

/// What `add` does when the id is already registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with [`PoolError::DuplicateId`].
    #[default]
    Reject,
    /// Replace the existing entry and hand it back to the caller.
    Replace,
}

/// Error type for pool operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A live process already uses this id.
    #[error("Process id already in use: {0}")]
    DuplicateId(ProcessId),
}

/// Shared registry of processes by id. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct ProcessPool {
    entries: Arc<RwLock<HashMap<ProcessId, ProcessHandle>>>,
    policy: DuplicatePolicy,
}

impl ProcessPool {
    /// Create an empty pool that rejects duplicate ids.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pool with the given duplicate policy.
    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            entries: Arc::default(),
            policy,
        }
    }

    /// Duplicate id policy of this pool.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register a process under its id.
    ///
    /// Returns the replaced handle when the policy is
    /// [`DuplicatePolicy::Replace`] and the id was taken.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::DuplicateId` if the id is taken and the policy is
    /// [`DuplicatePolicy::Reject`].
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn add(&self, handle: ProcessHandle) -> Result<Option<ProcessHandle>, PoolError> {
        let mut entries = self.entries.write().expect("RwLock poisoned");
        let id = handle.id().clone();

        if entries.contains_key(&id) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    tracing::warn!(process_id = %id, "Rejected duplicate process id");
                    return Err(PoolError::DuplicateId(id));
                }
                DuplicatePolicy::Replace => {
                    tracing::debug!(process_id = %id, "Replacing pooled process");
                }
            }
        }

        tracing::debug!(process_id = %id, runner = %handle.runner(), "Pooled process");
        Ok(entries.insert(id, handle))
    }

    /// Remove a process from the pool.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn remove(&self, id: &ProcessId) -> Option<ProcessHandle> {
        let removed = self.entries.write().expect("RwLock poisoned").remove(id);
        if removed.is_some() {
            tracing::debug!(process_id = %id, "Removed process from pool");
        }
        removed
    }

    /// Remove `handle`'s entry, unless another process has replaced it.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub(crate) fn release(&self, handle: &ProcessHandle) {
        let mut entries = self.entries.write().expect("RwLock poisoned");
        let current = entries
            .get(handle.id())
            .is_some_and(|pooled| pooled.same_process(handle));
        if current {
            entries.remove(handle.id());
            tracing::debug!(process_id = %handle.id(), "Released process from pool");
        }
    }

    /// Get a process by id.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn get(&self, id: &ProcessId) -> Option<ProcessHandle> {
        self.entries.read().expect("RwLock poisoned").get(id).cloned()
    }

    /// Check if an id is registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn contains(&self, id: &ProcessId) -> bool {
        self.entries.read().expect("RwLock poisoned").contains_key(id)
    }

    /// Number of registered processes.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("RwLock poisoned").len()
    }

    /// Returns true if no process is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all registered processes, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn ids(&self) -> Vec<ProcessId> {
        let mut ids: Vec<_> = self
            .entries
            .read()
            .expect("RwLock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Request cancellation of one process. Returns false if the id is unknown.
    #[must_use = "an unknown id is reported through the return value"]
    pub fn cancel(&self, id: &ProcessId) -> bool {
        match self.get(id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every registered process.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn cancel_all(&self) {
        let entries = self.entries.read().expect("RwLock poisoned");
        for handle in entries.values() {
            handle.cancel();
        }
    }
}
