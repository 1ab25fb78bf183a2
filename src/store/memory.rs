use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::model::PackageDocument;

/// In-process store, used by tests and ephemeral mirrors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, PackageDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Option<PackageDocument>> {
        Ok(self.documents.read().await.get(name).cloned())
    }

    async fn put(&self, name: &str, document: &PackageDocument) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(name.to_string(), document.clone());
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.documents.read().await.contains_key(name))
    }
}
