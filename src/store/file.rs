//! File-backed document store: one JSON document per package.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};

use super::DocumentStore;
use crate::model::{PackageDocument, PackageName};
use crate::runtime::Runtime;

/// Stores documents under `<root>/packages/<name>.json`.
///
/// Scoped packages land in a directory per scope:
/// `<root>/packages/@scope/name.json`.
pub struct FileStore<R: Runtime> {
    runtime: R,
    root: PathBuf,
}

impl<R: Runtime> FileStore<R> {
    pub fn new(runtime: R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    /// Returns: `<root>/packages`
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    /// Path of the document for `name`. Fails for names that are not valid
    /// package names, which also keeps lookups inside the store root.
    pub fn document_path(&self, name: &str) -> Result<PathBuf> {
        let name: PackageName = name
            .parse()
            .with_context(|| format!("Cannot map {:?} to a document path", name))?;
        let mut path = self.packages_dir();
        if let Some(scope) = name.scope() {
            path.push(format!("@{}", scope));
        }
        path.push(format!("{}.json", name.bare_name()));
        Ok(path)
    }
}

#[async_trait]
impl<R: Runtime> DocumentStore for FileStore<R> {
    #[tracing::instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<Option<PackageDocument>> {
        let path = self.document_path(name)?;
        if !self.runtime.exists(&path) {
            return Ok(None);
        }
        let content = self.runtime.read_to_string(&path)?;
        let document = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt document at {:?}", path))?;
        Ok(Some(document))
    }

    #[tracing::instrument(skip(self, document))]
    async fn put(&self, name: &str, document: &PackageDocument) -> Result<()> {
        let path = self.document_path(name)?;

        if let Some(parent) = path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp_path = path.with_extension("json.tmp");
        self.runtime
            .write(&tmp_path, content.as_bytes())
            .with_context(|| format!("Failed to save document to {:?}", tmp_path))?;
        if let Err(e) = self.runtime.rename(&tmp_path, &path) {
            if let Err(cleanup) = self.runtime.remove_file(&tmp_path) {
                warn!("Failed to remove {:?}: {}", tmp_path, cleanup);
            }
            return Err(e.context(format!("Failed to replace {:?}", path)));
        }

        debug!("Stored {} at {:?}", name, path);
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.document_path(name)?;
        Ok(self.runtime.exists(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::local_package;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;

    #[test]
    fn test_document_path() {
        let store = FileStore::new(MockRuntime::new(), PathBuf::from("/root"));
        assert_eq!(
            store.document_path("pedding").unwrap(),
            PathBuf::from("/root/packages/pedding.json")
        );
        assert_eq!(
            store.document_path("@cnpmtest/pedding").unwrap(),
            PathBuf::from("/root/packages/@cnpmtest/pedding.json")
        );
        assert_eq!(
            store.document_path("jquery.min").unwrap(),
            PathBuf::from("/root/packages/jquery.min.json")
        );
        assert!(store.document_path("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/root/packages/pedding.json")))
            .returning(|_| false);

        let store = FileStore::new(runtime, PathBuf::from("/root"));
        assert!(store.get("pedding").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_corrupt_document() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/root/packages/broken.json");
        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(path))
            .returning(|_| Ok("{not json".into()));

        let store = FileStore::new(runtime, PathBuf::from("/root"));
        let err = store.get("broken").await.unwrap_err();
        assert!(err.to_string().contains("Corrupt document"));
    }

    #[tokio::test]
    async fn test_put_writes_temp_then_renames() {
        let mut runtime = MockRuntime::new();
        let dir = PathBuf::from("/root/packages/@scope");
        let tmp = PathBuf::from("/root/packages/@scope/name.json.tmp");
        let final_path = PathBuf::from("/root/packages/@scope/name.json");

        runtime
            .expect_exists()
            .with(eq(dir.clone()))
            .returning(|_| false);
        runtime
            .expect_create_dir_all()
            .with(eq(dir))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_write()
            .withf(move |p, _| p == tmp.as_path())
            .times(1)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .withf(move |_, to| to == final_path.as_path())
            .times(1)
            .returning(|_, _| Ok(()));

        let store = FileStore::new(runtime, PathBuf::from("/root"));
        let doc = PackageDocument::Normal(local_package("@scope/name", &[("1.0.0", 1)]));
        store.put("@scope/name", &doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_failed_rename_removes_temp_file() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime.expect_write().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("cross-device link")));
        runtime
            .expect_remove_file()
            .with(eq(PathBuf::from("/root/packages/pedding.json.tmp")))
            .times(1)
            .returning(|_| Ok(()));

        let store = FileStore::new(runtime, PathBuf::from("/root"));
        let doc = PackageDocument::Normal(local_package("pedding", &[("1.0.0", 1)]));
        let err = store.put("pedding", &doc).await.unwrap_err();
        assert!(err.to_string().contains("Failed to replace"));
    }

    #[tokio::test]
    async fn test_real_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(RealRuntime, dir.path().to_path_buf());

        let doc = PackageDocument::Normal(local_package("@scope/name", &[("1.0.0", 1)]));
        assert!(!store.exists("@scope/name").await.unwrap());
        store.put("@scope/name", &doc).await.unwrap();
        assert!(store.exists("@scope/name").await.unwrap());
        assert_eq!(store.get("@scope/name").await.unwrap(), Some(doc));
        assert!(!dir
            .path()
            .join("packages/@scope/name.json.tmp")
            .exists());
    }
}
