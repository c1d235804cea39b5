//! VectorCatalog - content-addressed vector storage with exact similarity search.

use crate::codec;
use crate::error::CatalogError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use shardex_core::vector::{cosine_similarity, validate_vector};
use shardex_core::{
    CatalogConfig, ContentId, ContentStore, EventTap, MarketEvent, RecordId, RecordMetadata,
    VectorError, VectorRecord,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One `find_similar` result.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub record: VectorRecord,
    pub similarity: f32,
}

struct CatalogEntry {
    record: VectorRecord,
    vector: Vec<f32>,
}

/// Catalog of uploaded vectors.
///
/// Payloads live in the injected [`ContentStore`]; the catalog keeps the
/// record metadata and a decoded copy of every vector for scanning. Records
/// are kept in upload order.
pub struct VectorCatalog {
    store: Arc<dyn ContentStore>,
    config: CatalogConfig,
    key: Option<[u8; 32]>,
    records: RwLock<IndexMap<RecordId, CatalogEntry>>,
    events: EventTap,
}

impl VectorCatalog {
    pub fn new(store: Arc<dyn ContentStore>, config: CatalogConfig) -> Self {
        Self {
            store,
            config,
            key: None,
            records: RwLock::new(IndexMap::new()),
            events: EventTap::new(),
        }
    }

    /// Seal payloads with this key before they reach the store.
    pub fn with_encryption_key(mut self, key: [u8; 32]) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_events(mut self, events: EventTap) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    pub async fn upload(
        &self,
        vector: &[f32],
        metadata: RecordMetadata,
    ) -> Result<VectorRecord, CatalogError> {
        self.upload_at(vector, metadata, Utc::now()).await
    }

    /// Upload with an explicit creation time.
    #[doc(hidden)]
    pub async fn upload_at(
        &self,
        vector: &[f32],
        metadata: RecordMetadata,
        created_at: DateTime<Utc>,
    ) -> Result<VectorRecord, CatalogError> {
        if vector.is_empty() {
            return Err(VectorError::Empty.into());
        }
        validate_vector(vector)?;

        let plain = codec::encode_vector(vector)?;
        let payload = match &self.key {
            Some(key) => codec::seal(key, &plain)?,
            None => plain,
        };
        let expected = ContentId::for_payload(&payload);
        let actual = self.store.put(payload).await?;
        if actual != expected {
            return Err(CatalogError::AddressMismatch { expected, actual });
        }

        let record = VectorRecord {
            id: RecordId::new(),
            content_id: actual,
            dimension: vector.len(),
            created_at,
            encrypted: self.key.is_some(),
            owner: metadata.owner,
            tags: metadata.tags,
        };
        self.records.write().await.insert(
            record.id,
            CatalogEntry {
                record: record.clone(),
                vector: vector.to_vec(),
            },
        );

        tracing::debug!(
            record_id = %record.id,
            content_id = %record.content_id,
            dimension = record.dimension,
            encrypted = record.encrypted,
            "vector uploaded"
        );
        self.events.emit(MarketEvent::VectorUploaded {
            record_id: record.id,
            content_id: record.content_id.clone(),
            dimension: record.dimension,
            encrypted: record.encrypted,
        });
        Ok(record)
    }

    /// Fetch and decode the vector stored under `content_id`.
    pub async fn retrieve(&self, content_id: &ContentId) -> Result<Vec<f32>, CatalogError> {
        let payload = self.store.get(content_id).await?;
        let actual = ContentId::for_payload(&payload);
        if actual != *content_id {
            return Err(CatalogError::AddressMismatch {
                expected: content_id.clone(),
                actual,
            });
        }

        let plain = if codec::is_sealed(&payload) {
            let key = self.key.as_ref().ok_or_else(|| {
                CatalogError::Crypto("payload is sealed and no key is configured".to_string())
            })?;
            codec::open(key, &payload)?
        } else {
            payload
        };
        codec::decode_vector(&plain)
    }

    /// Records whose cosine similarity to `query` is at least `threshold`,
    /// best first, truncated to `limit` (clamped to `max_limit`).
    pub async fn find_similar(
        &self,
        query: &[f32],
        threshold: Option<f32>,
        limit: Option<usize>,
    ) -> Result<Vec<SimilarityHit>, CatalogError> {
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);
        let mut hits = self.rank(query, threshold).await?;
        hits.truncate(limit);
        Ok(hits)
    }

    /// Every record whose similarity to `query` is at least `threshold`,
    /// best first and without a limit.
    ///
    /// Equal similarities are ordered newest first, then by reverse upload
    /// order. Records of another dimension or with zero norm are skipped.
    pub async fn rank(
        &self,
        query: &[f32],
        threshold: Option<f32>,
    ) -> Result<Vec<SimilarityHit>, CatalogError> {
        if query.is_empty() {
            return Err(VectorError::Empty.into());
        }
        validate_vector(query)?;
        if query.iter().all(|x| *x == 0.0) {
            return Err(VectorError::ZeroVector.into());
        }
        let threshold = threshold.unwrap_or(self.config.default_threshold);

        let records = self.records.read().await;
        let mut scored: Vec<(f32, usize, &VectorRecord)> = Vec::new();
        for (position, entry) in records.values().enumerate() {
            if entry.vector.len() != query.len() {
                continue;
            }
            let similarity = match cosine_similarity(query, &entry.vector) {
                Ok(similarity) => similarity,
                Err(VectorError::ZeroVector) => continue,
                Err(err) => return Err(err.into()),
            };
            if similarity >= threshold {
                scored.push((similarity, position, &entry.record));
            }
        }

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.2.created_at.cmp(&a.2.created_at))
                .then_with(|| b.1.cmp(&a.1))
        });

        Ok(scored
            .into_iter()
            .map(|(similarity, _, record)| SimilarityHit {
                record: record.clone(),
                similarity,
            })
            .collect())
    }

    pub async fn record(&self, id: &RecordId) -> Option<VectorRecord> {
        self.records.read().await.get(id).map(|e| e.record.clone())
    }

    /// All records in upload order.
    pub async fn records(&self) -> Vec<VectorRecord> {
        self.records
            .read()
            .await
            .values()
            .map(|e| e.record.clone())
            .collect()
    }

    /// Move ownership of a record from `from` to `to`.
    ///
    /// Fails without change unless the current owner is exactly `from`.
    pub async fn transfer_owner(
        &self,
        record_id: &RecordId,
        from: Option<&str>,
        to: &str,
    ) -> Result<VectorRecord, CatalogError> {
        let mut records = self.records.write().await;
        let entry = records
            .get_mut(record_id)
            .ok_or(CatalogError::RecordNotFound(*record_id))?;
        if entry.record.owner.as_deref() != from {
            return Err(CatalogError::OwnerMismatch {
                record_id: *record_id,
                expected: from.map(str::to_string),
                actual: entry.record.owner.clone(),
            });
        }
        entry.record.owner = Some(to.to_string());
        let record = entry.record.clone();
        drop(records);

        self.events.emit(MarketEvent::OwnershipTransferred {
            record_id: *record_id,
            from: from.map(str::to_string),
            to: to.to_string(),
        });
        Ok(record)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl std::fmt::Debug for VectorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorCatalog")
            .field("encrypted", &self.key.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
