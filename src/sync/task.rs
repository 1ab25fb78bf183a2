//! Sync task options, states and results.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::SyncError;

/// Options fixed when a task is created. Callers joining a live task do not
/// change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub recurse_dependencies: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            recurse_dependencies: true,
        }
    }
}

impl SyncOptions {
    /// Sync only the package itself.
    pub fn shallow() -> Self {
        Self {
            recurse_dependencies: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Fetching,
    Persisting,
    ExpandingDependencies,
    Succeeded,
    Failed,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Succeeded | SyncStatus::Failed)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Fetching => "fetching",
            SyncStatus::Persisting => "persisting",
            SyncStatus::ExpandingDependencies => "expanding dependencies",
            SyncStatus::Succeeded => "succeeded",
            SyncStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What happened to one dependency during expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "error", rename_all = "snake_case")]
pub enum DependencyResult {
    /// A new task synced it.
    Synced,
    /// Already in the store, nothing fetched.
    AlreadyPresent,
    /// Another task was already syncing it; not awaited.
    Joined,
    /// Not eligible for implicit sync (scoped or malformed name).
    Skipped,
    /// The dependency task failed. Never fails the parent.
    Failed(String),
}

/// Summary of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub name: String,
    /// Number of versions in the persisted document.
    pub versions: usize,
    /// Upstream reported the package as removed.
    pub unpublished: bool,
    /// The package is published locally, so the store was left untouched.
    pub skipped_local: bool,
    pub dependencies: BTreeMap<String, DependencyResult>,
}

impl SyncReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            versions: 0,
            unpublished: false,
            skipped_local: false,
            dependencies: BTreeMap::new(),
        }
    }

    pub fn failed_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|(_, result)| matches!(result, DependencyResult::Failed(_)))
            .map(|(name, _)| name.as_str())
    }
}

/// The single outcome every waiter of a task receives.
pub type SyncOutcome = Result<SyncReport, SyncError>;

/// Value broadcast on a task's watch channel.
#[derive(Debug, Clone)]
pub(crate) struct TaskState {
    pub(crate) status: SyncStatus,
    pub(crate) outcome: Option<SyncOutcome>,
}

impl TaskState {
    pub(crate) fn pending() -> Self {
        Self {
            status: SyncStatus::Pending,
            outcome: None,
        }
    }

    pub(crate) fn finished(outcome: SyncOutcome) -> Self {
        let status = if outcome.is_ok() {
            SyncStatus::Succeeded
        } else {
            SyncStatus::Failed
        };
        Self {
            status,
            outcome: Some(outcome),
        }
    }
}
