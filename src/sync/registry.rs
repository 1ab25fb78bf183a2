use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info};
use tokio::sync::watch;

use super::SyncContext;
use super::task::{SyncOptions, SyncOutcome, SyncStatus, TaskState};
use super::worker::SyncWorker;
use crate::error::SyncError;

struct TaskEntry {
    id: u64,
    state: watch::Receiver<TaskState>,
}

struct RegistryInner {
    context: Arc<SyncContext>,
    tasks: Mutex<HashMap<String, TaskEntry>>,
    next_id: AtomicU64,
}

/// In-flight sync tasks keyed by package name.
///
/// At most one task per name is live at any instant. Cloning is cheap and
/// every clone shares the same table.
#[derive(Clone)]
pub struct SyncTaskRegistry {
    inner: Arc<RegistryInner>,
}

impl SyncTaskRegistry {
    pub fn new(context: SyncContext) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                context: Arc::new(context),
                tasks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn context(&self) -> &Arc<SyncContext> {
        &self.inner.context
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the live task for `name`, or start one with `options`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn acquire(&self, name: &str, options: SyncOptions) -> SyncHandle {
        let mut tasks = self.tasks();

        if let Some(entry) = tasks.get(name) {
            debug!("Joining in-flight sync of {} (task #{})", name, entry.id);
            return SyncHandle {
                name: name.to_string(),
                task_id: entry.id,
                joined: true,
                state: entry.state.clone(),
            };
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(TaskState::pending());
        tasks.insert(
            name.to_string(),
            TaskEntry {
                id,
                state: receiver.clone(),
            },
        );
        drop(tasks);

        info!(
            "Created sync task #{} for {} (dependencies: {})",
            id, name, options.recurse_dependencies
        );
        let worker = SyncWorker::new(self.clone(), name, id, options, sender);
        tokio::spawn(worker.run());

        SyncHandle {
            name: name.to_string(),
            task_id: id,
            joined: false,
            state: receiver,
        }
    }

    /// Remove the entry of a finished task. Called by the worker before it
    /// broadcasts its outcome, so a caller acquiring after the broadcast
    /// starts a fresh task.
    pub(crate) fn release(&self, name: &str, id: u64) {
        let mut tasks = self.tasks();
        match tasks.get(name) {
            Some(entry) if entry.id == id => {
                tasks.remove(name);
            }
            Some(entry) => {
                error!(
                    "{}: task #{} finished but the table holds task #{}",
                    SyncError::DedupJoinFailure(name.to_string()),
                    id,
                    entry.id
                );
            }
            None => {
                error!(
                    "{}: task #{} finished but was not registered",
                    SyncError::DedupJoinFailure(name.to_string()),
                    id
                );
            }
        }
    }

    /// Names with a live task, sorted.
    pub fn in_flight(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_syncing(&self, name: &str) -> bool {
        self.tasks().contains_key(name)
    }

    /// Wait until no task is live, including tasks started while waiting.
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<watch::Receiver<TaskState>> =
                self.tasks().values().map(|e| e.state.clone()).collect();
            if pending.is_empty() {
                return;
            }
            for mut state in pending {
                let _ = state.wait_for(|s| s.outcome.is_some()).await;
            }
        }
    }
}

/// Subscription to one sync task.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    name: String,
    task_id: u64,
    joined: bool,
    state: watch::Receiver<TaskState>,
}

impl SyncHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Whether this handle joined a task somebody else started.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn status(&self) -> SyncStatus {
        self.state.borrow().status
    }

    /// Wait for the task's terminal state. Every handle of a task receives
    /// the same outcome.
    pub async fn wait(mut self) -> SyncOutcome {
        let outcome = match self.state.wait_for(|s| s.outcome.is_some()).await {
            Ok(state) => state.outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            let err = SyncError::DedupJoinFailure(self.name.clone());
            error!("{}: task #{} ended without an outcome", err, self.task_id);
            Err(err)
        })
    }
}
