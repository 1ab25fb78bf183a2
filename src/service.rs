//! Registry operations exposed to the HTTP-adjacent layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;

use crate::cache::{CacheOutcome, ConditionalRequest, Validator, evaluate};
use crate::error::{NotFoundBody, RegistryError};
use crate::model::{Dist, Maintainer, Package, PackageDocument, PackageName, VersionManifest};
use crate::store::{DocumentStore, PackageLocks};
use crate::sync::{
    SyncContext, SyncHandle, SyncOptions, SyncScheduler, SyncSettings, SyncTaskRegistry,
};
use crate::upstream::Upstream;

/// Answer of the read path.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResponse {
    /// The rendered document and the validator to surface with it.
    Full { body: Value, validator: Validator },
    /// The caller's validator is current. No body.
    NotModified { validator: Validator },
    /// Removed upstream: only the `time.unpublished` block is presented.
    Unpublished { body: Value },
    NotFound(NotFoundBody),
}

/// A version published directly to this registry.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    pub dist: Dist,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    /// Dist-tag to point at the new version. Defaults to `latest`.
    #[serde(default)]
    pub tag: Option<String>,
}

pub const DEFAULT_TAG: &str = "latest";

pub struct RegistryService {
    store: Arc<dyn DocumentStore>,
    locks: PackageLocks,
    scheduler: SyncScheduler,
}

impl RegistryService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        upstream: Arc<dyn Upstream>,
        settings: SyncSettings,
        sync_by_install: bool,
    ) -> Self {
        let locks = PackageLocks::new();
        let context = SyncContext::new(store.clone(), upstream, locks.clone(), settings);
        let registry = SyncTaskRegistry::new(context);
        Self {
            store,
            locks,
            scheduler: SyncScheduler::new(registry, sync_by_install),
        }
    }

    pub fn registry(&self) -> &SyncTaskRegistry {
        self.scheduler.registry()
    }

    /// Read a package, syncing it on a miss when the scheduler allows.
    #[tracing::instrument(skip(self, request))]
    pub async fn read(
        &self,
        name: &str,
        request: &ConditionalRequest,
    ) -> Result<ReadResponse, RegistryError> {
        if name.parse::<PackageName>().is_err() {
            return Ok(ReadResponse::NotFound(NotFoundBody::default()));
        }

        let document = match self.store.get(name).await? {
            Some(document) => Some(document),
            None => self.scheduler.sync_on_miss(name).await?,
        };

        let Some(document) = document else {
            debug!("{} not found", name);
            return Ok(ReadResponse::NotFound(NotFoundBody::default()));
        };

        if document.is_unpublished() {
            return Ok(ReadResponse::Unpublished {
                body: document.to_view(),
            });
        }

        Ok(match evaluate(request, &document) {
            CacheOutcome::NotModified(validator) => ReadResponse::NotModified { validator },
            CacheOutcome::Full {
                document,
                validator,
            } => ReadResponse::Full {
                body: document.to_view(),
                validator,
            },
        })
    }

    /// Publish a new version of a local package, creating the package on
    /// first publish. Returns the version's modification time, which is
    /// also the package's new `time.modified`.
    #[tracing::instrument(skip(self, request), fields(name = %request.name, version = %request.version))]
    pub async fn publish(&self, request: PublishRequest) -> Result<DateTime<Utc>, RegistryError> {
        let name: PackageName = request.name.parse()?;
        semver::Version::parse(&request.version).map_err(|e| RegistryError::InvalidVersion {
            version: request.version.clone(),
            reason: e.to_string(),
        })?;

        let _guard = self.lock(&name).await;
        let now = Utc::now().trunc_subsecs(3);

        let mut package = match self.store.get(name.as_str()).await? {
            Some(PackageDocument::Unpublished(_)) => {
                return Err(RegistryError::Unpublished(name.to_string()));
            }
            Some(PackageDocument::Normal(package)) if !package.is_local => {
                return Err(RegistryError::NotLocal(name.to_string()));
            }
            Some(PackageDocument::Normal(package)) => package,
            None => {
                info!("Creating local package {}", name);
                Package::new_local(name.as_str(), vec![], now)
            }
        };

        for maintainer in request.maintainers {
            if !package.maintainers.iter().any(|m| m.name == maintainer.name) {
                package.maintainers.push(maintainer);
            }
        }

        let modified_at = package.next_publish_time(now);
        package.add_version(VersionManifest {
            name: name.to_string(),
            version: request.version.clone(),
            description: request.description,
            dependencies: request.dependencies,
            dist: request.dist,
            modified_at,
        })?;
        let tag = request.tag.as_deref().unwrap_or(DEFAULT_TAG);
        package.set_tag(tag, &request.version)?;

        self.store
            .put(name.as_str(), &PackageDocument::Normal(package))
            .await?;
        info!("Published {}@{} as {}", name, request.version, tag);
        Ok(modified_at)
    }

    /// Point `tag` at an existing `version`. Returns the new `time.modified`,
    /// which is the tagged version's own timestamp.
    #[tracing::instrument(skip(self))]
    pub async fn put_tag(
        &self,
        name: &str,
        tag: &str,
        version: &str,
    ) -> Result<DateTime<Utc>, RegistryError> {
        let name: PackageName = name.parse()?;
        let _guard = self.lock(&name).await;

        let mut package = self.load_package(&name).await?;
        let modified = package.set_tag(tag, version)?;
        self.store
            .put(name.as_str(), &PackageDocument::Normal(package))
            .await?;
        debug!("{}: {} -> {}", name, tag, version);
        Ok(modified)
    }

    /// Returns true if the user was not starring the package before.
    pub async fn star(&self, name: &str, user: &str) -> Result<bool, RegistryError> {
        self.update_package(name, |package| package.star(user)).await
    }

    /// Returns true if the user was starring the package before.
    pub async fn unstar(&self, name: &str, user: &str) -> Result<bool, RegistryError> {
        self.update_package(name, |package| package.unstar(user)).await
    }

    /// Adds a maintainer to a local or mirrored package. The maintainer is
    /// kept across later syncs even if upstream does not list it. Returns
    /// false if a maintainer with that name is already listed.
    pub async fn add_maintainer(
        &self,
        name: &str,
        maintainer: Maintainer,
    ) -> Result<bool, RegistryError> {
        self.update_package(name, |package| package.add_maintainer(maintainer))
            .await
    }

    /// Start (or join) a sync of `name` regardless of what the store holds.
    pub fn sync(&self, name: &str, options: SyncOptions) -> Result<SyncHandle, RegistryError> {
        let name: PackageName = name.parse()?;
        Ok(self.registry().acquire(name.as_str(), options))
    }

    /// Wait for every in-flight sync task. Tasks cannot be cancelled, so
    /// this is the teardown step.
    pub async fn shutdown(&self) {
        let in_flight = self.registry().in_flight();
        if !in_flight.is_empty() {
            info!("Waiting for {} sync task(s) to finish...", in_flight.len());
        }
        self.registry().wait_idle().await;
    }

    async fn update_package<F>(&self, name: &str, update: F) -> Result<bool, RegistryError>
    where
        F: FnOnce(&mut Package) -> bool,
    {
        let name: PackageName = name.parse()?;
        let _guard = self.lock(&name).await;

        let mut package = self.load_package(&name).await?;
        let changed = update(&mut package);
        if changed {
            self.store
                .put(name.as_str(), &PackageDocument::Normal(package))
                .await?;
        }
        Ok(changed)
    }

    async fn load_package(&self, name: &PackageName) -> Result<Package, RegistryError> {
        match self.store.get(name.as_str()).await? {
            Some(PackageDocument::Normal(package)) => Ok(package),
            Some(PackageDocument::Unpublished(_)) => {
                Err(RegistryError::Unpublished(name.to_string()))
            }
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    async fn lock(&self, name: &PackageName) -> OwnedMutexGuard<()> {
        self.locks.lock(name.as_str()).await
    }
}
