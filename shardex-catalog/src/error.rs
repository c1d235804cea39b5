//! Catalog errors

use shardex_core::{ContentId, ContentStoreError, RecordId, VectorError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("content store error: {0}")]
    Store(ContentStoreError),

    #[error("content not found: {0}")]
    NotFound(ContentId),

    #[error("payload codec error: {0}")]
    Codec(String),

    #[error("content address mismatch: expected {expected}, got {actual}")]
    AddressMismatch {
        expected: ContentId,
        actual: ContentId,
    },

    #[error("payload encryption error: {0}")]
    Crypto(String),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("record {record_id} is owned by {actual:?}, not {expected:?}")]
    OwnerMismatch {
        record_id: RecordId,
        expected: Option<String>,
        actual: Option<String>,
    },
}

impl From<ContentStoreError> for CatalogError {
    fn from(err: ContentStoreError) -> Self {
        match err {
            ContentStoreError::NotFound(id) => CatalogError::NotFound(id),
            other => CatalogError::Store(other),
        }
    }
}
