//! Filesystem content store
//!
//! Each payload lives at `<root>/<first two hex chars>/<full hex digest>`.

use async_trait::async_trait;
use shardex_core::{ContentId, ContentStore, ContentStoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Content store backed by a directory tree
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the root directory exists
    pub async fn init(&self) -> Result<(), ContentStoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn blob_path(&self, id: &ContentId) -> PathBuf {
        let hex = id.digest_hex();
        self.root.join(&hex[..2]).join(hex)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<ContentId, ContentStoreError> {
        let id = ContentId::for_payload(&bytes);
        let path = self.blob_path(&id);
        if fs::try_exists(&path).await? {
            return Ok(id);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension(format!("{}.tmp", temp_suffix()));
        write_atomically(&temp_path, &path, &bytes).await?;

        tracing::debug!(content_id = %id, bytes = bytes.len(), "stored payload");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Vec<u8>, ContentStoreError> {
        match fs::read(self.blob_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ContentStoreError::NotFound(id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn contains(&self, id: &ContentId) -> Result<bool, ContentStoreError> {
        Ok(fs::try_exists(self.blob_path(id)).await?)
    }
}

/// Write to a temp file and rename so readers never see a partial blob.
/// The temp file is removed if any step fails.
async fn write_atomically(temp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let result = async {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp_path, path).await
    }
    .await;

    if result.is_err()
        && let Err(err) = fs::remove_file(temp_path).await
        && err.kind() != ErrorKind::NotFound
    {
        tracing::warn!(path = %temp_path.display(), error = %err, "failed to remove temp file");
    }
    result
}

/// Distinguishes temp files of concurrent writers of the same blob.
fn temp_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", std::process::id(), COUNTER.fetch_add(1, Ordering::Relaxed))
}
