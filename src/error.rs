//! Error taxonomy for synchronization and registry operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal error of a sync task.
///
/// Cloneable because a single outcome is broadcast to every waiter of a task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Upstream has no such package. Terminal, never retried.
    #[error("package {0} not found upstream")]
    UpstreamMissing(String),

    /// Transport failure that outlived the retry budget.
    #[error("upstream unreachable while syncing {name}: {reason}")]
    UpstreamUnreachable { name: String, reason: String },

    /// Reconciled document could not be written to the store.
    #[error("failed to persist {name}: {reason}")]
    PersistFailed { name: String, reason: String },

    /// The worker future panicked before reaching a terminal state.
    #[error("sync worker for {0} panicked")]
    WorkerPanicked(String),

    /// The task table lost track of a live task. Should not occur.
    #[error("sync task bookkeeping for {0} is inconsistent")]
    DedupJoinFailure(String),
}

/// Errors surfaced by [`crate::service::RegistryService`] operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("document not found")]
    NotFound(String),

    #[error("invalid package name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("version {version} of {name} already exists")]
    VersionExists { name: String, version: String },

    #[error("package {0} is mirrored from upstream and cannot be published locally")]
    NotLocal(String),

    #[error("tag {tag} of {name} references missing version {version}")]
    TagTargetMissing {
        name: String,
        tag: String,
        version: String,
    },

    #[error("package {0} has been unpublished")]
    Unpublished(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Structured payload returned for unknown packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundBody {
    pub error: String,
    pub reason: String,
}

impl Default for NotFoundBody {
    fn default() -> Self {
        Self {
            error: "not_found".to_string(),
            reason: "document not found".to_string(),
        }
    }
}
