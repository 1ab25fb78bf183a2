//! Upstream abstraction for the mirrored public registry.
//!
//! The sync worker only sees the [`Upstream`] trait, so tests can swap the
//! HTTP implementation for a mock.

mod npm;
mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use npm::{DEFAULT_REGISTRY_URL, NpmUpstream};
pub(crate) use types::parse_timestamp;
pub use types::{UpstreamManifest, UpstreamTime, UpstreamUnpublished, UpstreamVersion};

/// Result of asking upstream for a package.
#[derive(Debug, Clone)]
pub enum UpstreamPackage {
    Found(UpstreamManifest),
    NotFound,
}

/// Trait for upstream registries.
///
/// A single call is one transport attempt. Transport failures come back as
/// errors; a package upstream does not know is `Ok(UpstreamPackage::NotFound)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Base URL of the upstream registry.
    fn registry_url(&self) -> &str;

    /// Fetch the full metadata document of a package.
    async fn fetch_package(&self, name: &str) -> Result<UpstreamPackage>;
}
