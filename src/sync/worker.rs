use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures_util::{FutureExt, StreamExt, stream};
use log::{debug, info, warn};
use tokio::sync::watch;

use super::registry::SyncTaskRegistry;
use super::task::{DependencyResult, SyncOptions, SyncOutcome, SyncReport, SyncStatus, TaskState};
use crate::error::SyncError;
use crate::model::{PackageDocument, PackageName, reconcile};
use crate::retry::with_retry;
use crate::upstream::{UpstreamManifest, UpstreamPackage};

/// Drives one task through
/// `Pending -> Fetching -> Persisting -> ExpandingDependencies -> Succeeded`.
pub(crate) struct SyncWorker {
    registry: SyncTaskRegistry,
    name: String,
    id: u64,
    options: SyncOptions,
    state: watch::Sender<TaskState>,
}

enum Persisted {
    Package(BTreeSet<String>, usize),
    Unpublished,
    SkippedLocal,
}

impl SyncWorker {
    pub(crate) fn new(
        registry: SyncTaskRegistry,
        name: &str,
        id: u64,
        options: SyncOptions,
        state: watch::Sender<TaskState>,
    ) -> Self {
        Self {
            registry,
            name: name.to_string(),
            id,
            options,
            state,
        }
    }

    /// Run to a terminal state, unregister, then broadcast the outcome.
    pub(crate) async fn run(self) {
        let outcome = AssertUnwindSafe(self.execute())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(SyncError::WorkerPanicked(self.name.clone())));

        match &outcome {
            Ok(report) => info!(
                "Synced {} (task #{}): {} versions, {} dependencies",
                self.name,
                self.id,
                report.versions,
                report.dependencies.len()
            ),
            Err(e) => warn!("Sync task #{} failed: {}", self.id, e),
        }

        self.registry.release(&self.name, self.id);
        self.state.send_replace(TaskState::finished(outcome));
    }

    fn set_status(&self, status: SyncStatus) {
        debug!("{} (task #{}): {}", self.name, self.id, status);
        self.state.send_modify(|state| state.status = status);
    }

    async fn execute(&self) -> SyncOutcome {
        let manifest = self.fetch().await?;
        let mut report = SyncReport::new(&self.name);

        match self.persist(manifest).await? {
            Persisted::SkippedLocal => report.skipped_local = true,
            Persisted::Unpublished => report.unpublished = true,
            Persisted::Package(dependencies, versions) => {
                report.versions = versions;
                if self.options.recurse_dependencies {
                    self.set_status(SyncStatus::ExpandingDependencies);
                    report.dependencies = self.expand(dependencies).await;
                }
            }
        }
        Ok(report)
    }

    #[tracing::instrument(skip(self), fields(name = %self.name))]
    async fn fetch(&self) -> Result<UpstreamManifest, SyncError> {
        self.set_status(SyncStatus::Fetching);
        let context = self.registry.context();

        let _permit = context
            .fetch_permits
            .acquire()
            .await
            .map_err(|_| SyncError::UpstreamUnreachable {
                name: self.name.clone(),
                reason: "fetch pool closed".to_string(),
            })?;

        let operation = format!("Fetch {}", self.name);
        let fetched = with_retry(&operation, &context.settings.retry, || {
            context.upstream.fetch_package(&self.name)
        })
        .await;

        match fetched {
            Ok(UpstreamPackage::Found(manifest)) => Ok(manifest),
            Ok(UpstreamPackage::NotFound) => Err(SyncError::UpstreamMissing(self.name.clone())),
            Err(e) => Err(SyncError::UpstreamUnreachable {
                name: self.name.clone(),
                reason: format!("{:#}", e),
            }),
        }
    }

    /// Reconcile and write under the package lock, so local mutations made
    /// while fetching are read back and kept.
    async fn persist(&self, manifest: UpstreamManifest) -> Result<Persisted, SyncError> {
        self.set_status(SyncStatus::Persisting);
        let context = self.registry.context();
        let persist_failed = |e: anyhow::Error| SyncError::PersistFailed {
            name: self.name.clone(),
            reason: format!("{:#}", e),
        };

        let _guard = context.locks.lock(&self.name).await;
        let existing = context.store.get(&self.name).await.map_err(persist_failed)?;

        if existing.as_ref().is_some_and(PackageDocument::is_local) {
            info!("{} is published locally, leaving it untouched", self.name);
            return Ok(Persisted::SkippedLocal);
        }

        let document = reconcile(existing.as_ref(), manifest, Utc::now());
        context
            .store
            .put(&self.name, &document)
            .await
            .map_err(persist_failed)?;

        Ok(match document {
            PackageDocument::Normal(package) => {
                Persisted::Package(package.dependency_names(), package.versions.len())
            }
            PackageDocument::Unpublished(_) => {
                info!("{} was unpublished upstream", self.name);
                Persisted::Unpublished
            }
        })
    }

    /// Sync each missing dependency one level deep, `dependency_concurrency`
    /// at a time. Failures are recorded, never propagated.
    async fn expand(&self, dependencies: BTreeSet<String>) -> BTreeMap<String, DependencyResult> {
        let concurrency = self.registry.context().settings.dependency_concurrency.max(1);
        debug!(
            "{}: expanding {} dependencies ({} at a time)",
            self.name,
            dependencies.len(),
            concurrency
        );

        stream::iter(dependencies)
            .map(|dependency| async move {
                let result = self.sync_dependency(&dependency).await;
                (dependency, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn sync_dependency(&self, dependency: &str) -> DependencyResult {
        match dependency.parse::<PackageName>() {
            Ok(name) if !name.is_scoped() => {}
            _ => return DependencyResult::Skipped,
        }

        match self.registry.context().store.exists(dependency).await {
            Ok(true) => return DependencyResult::AlreadyPresent,
            Ok(false) => {}
            Err(e) => {
                warn!(
                    "Cannot check dependency {} of {}: {:#}",
                    dependency, self.name, e
                );
                return DependencyResult::Failed(e.to_string());
            }
        }

        let handle = self.registry.acquire(dependency, SyncOptions::shallow());
        if handle.is_joined() {
            // Not awaited: the live task may itself be waiting on us.
            return DependencyResult::Joined;
        }

        match handle.wait().await {
            Ok(_) => DependencyResult::Synced,
            Err(e) => {
                warn!("Dependency {} of {} failed to sync: {}", dependency, self.name, e);
                DependencyResult::Failed(e.to_string())
            }
        }
    }
}
