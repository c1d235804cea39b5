//! ContentStore trait: content-addressed payload storage.
//!
//! Implementations live in the `shardex-catalog` crate.

use crate::types::ContentId;
use async_trait::async_trait;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    #[error("content not found: {0}")]
    NotFound(ContentId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Content-addressed byte storage (IPFS or equivalent).
///
/// `put` must return `ContentId::for_payload(bytes)`; the catalog rejects any
/// other address.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist `bytes` and return their address.
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentId, ContentStoreError>;

    /// Fetch the bytes stored under `id`.
    async fn get(&self, id: &ContentId) -> Result<Vec<u8>, ContentStoreError>;

    /// Check if an address is present
    async fn contains(&self, id: &ContentId) -> Result<bool, ContentStoreError> {
        match self.get(id).await {
            Ok(_) => Ok(true),
            Err(ContentStoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
