//! In-memory content store (for testing)

use async_trait::async_trait;
use shardex_core::{ContentId, ContentStore, ContentStoreError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory content store
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentId, ContentStoreError> {
        let id = ContentId::for_payload(&bytes);
        self.blobs.write().await.entry(id.clone()).or_insert(bytes);
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Vec<u8>, ContentStoreError> {
        self.blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(id.clone()))
    }

    async fn contains(&self, id: &ContentId) -> Result<bool, ContentStoreError> {
        Ok(self.blobs.read().await.contains_key(id))
    }
}
