use anyhow::Result;
use log::{debug, info};

use super::registry::SyncTaskRegistry;
use super::task::SyncOptions;
use crate::model::{PackageDocument, is_scoped};

/// Decides whether a read miss triggers an on-demand sync.
#[derive(Clone)]
pub struct SyncScheduler {
    registry: SyncTaskRegistry,
    sync_by_install: bool,
}

impl SyncScheduler {
    pub fn new(registry: SyncTaskRegistry, sync_by_install: bool) -> Self {
        Self {
            registry,
            sync_by_install,
        }
    }

    pub fn registry(&self) -> &SyncTaskRegistry {
        &self.registry
    }

    /// True only for an unscoped name that is absent from the store while
    /// on-demand sync is enabled. Scoped names never sync implicitly.
    pub async fn resolve_on_miss(&self, name: &str) -> Result<bool> {
        if !self.sync_by_install || is_scoped(name) {
            return Ok(false);
        }
        let present = self.registry.context().store.exists(name).await?;
        Ok(!present)
    }

    /// Block until an on-demand sync of `name` finishes and return the
    /// synchronized document. `None` when no sync is allowed or it failed.
    ///
    /// The caller's miss may be stale: a concurrent sync can store the
    /// document between that read and this call. The store is read again in
    /// that case so every reader of a synced package sees it.
    #[tracing::instrument(skip(self))]
    pub async fn sync_on_miss(&self, name: &str) -> Result<Option<PackageDocument>> {
        if !self.resolve_on_miss(name).await? {
            debug!("{} not eligible for on-demand sync", name);
            return self.registry.context().store.get(name).await;
        }

        let handle = self.registry.acquire(name, SyncOptions::default());
        match handle.wait().await {
            Ok(_) => self.registry.context().store.get(name).await,
            Err(e) => {
                info!("On-demand sync of {} failed, answering not found: {}", name, e);
                Ok(None)
            }
        }
    }
}
