//! Synchronization engine.
//!
//! # Structure
//!
//! - `registry` - In-flight task table: dedup and completion broadcast
//! - `worker` - One task: fetch, persist, expand dependencies
//! - `scheduler` - Whether a read miss should trigger a sync
//! - `task` - Options, statuses and reports

mod registry;
mod scheduler;
mod task;
mod worker;

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::retry::RetryPolicy;
use crate::store::{DocumentStore, PackageLocks};
use crate::upstream::Upstream;

pub use registry::{SyncHandle, SyncTaskRegistry};
pub use scheduler::SyncScheduler;
pub use task::{DependencyResult, SyncOptions, SyncOutcome, SyncReport, SyncStatus};

/// Default number of dependencies expanded at once by one task.
pub const DEFAULT_DEPENDENCY_CONCURRENCY: usize = 5;

/// Default cap on simultaneous upstream fetches across all tasks.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub retry: RetryPolicy,
    pub dependency_concurrency: usize,
    pub max_concurrent_fetches: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            dependency_concurrency: DEFAULT_DEPENDENCY_CONCURRENCY,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Collaborators shared by every sync task.
pub struct SyncContext {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) upstream: Arc<dyn Upstream>,
    pub(crate) locks: PackageLocks,
    pub(crate) settings: SyncSettings,
    pub(crate) fetch_permits: Arc<Semaphore>,
}

impl SyncContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        upstream: Arc<dyn Upstream>,
        locks: PackageLocks,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            upstream,
            locks,
            fetch_permits: Arc::new(Semaphore::new(settings.max_concurrent_fetches.max(1))),
            settings,
        }
    }
}
