//! Document store for package aggregates.
//!
//! One [`PackageDocument`] per package name. Writes replace the whole
//! document, so a single `put` is the atomic unit readers can observe.

mod file;
mod locks;
mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::PackageDocument;

pub use file::FileStore;
pub use locks::PackageLocks;
pub use memory::MemoryStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document stored under `name`, if any.
    async fn get(&self, name: &str) -> Result<Option<PackageDocument>>;

    /// Atomically replace the document stored under `name`.
    async fn put(&self, name: &str, document: &PackageDocument) -> Result<()>;

    /// Whether any document (normal or unpublished) is stored under `name`.
    async fn exists(&self, name: &str) -> Result<bool>;
}
