// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for record reads.
//!
//! Records never change once written, so a cached `get` never goes stale
//! and entries need no TTL. `annotations_for` grows as annotations are
//! appended and always goes to the inner gateway.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;

use super::{GatewayError, RecordId, StorageGateway, StoredRecord};
use crate::metadata::Metadata;

/// Default number of records kept.
pub const DEFAULT_CAPACITY: usize = 256;

/// Read-through cache in front of another gateway.
pub struct CachedGateway {
    inner: Arc<dyn StorageGateway>,
    cache: Mutex<LruCache<RecordId, StoredRecord>>,
}

impl CachedGateway {
    pub fn new(inner: Arc<dyn StorageGateway>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cached(&self, id: &RecordId) -> Option<StoredRecord> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(id).cloned()
    }

    fn remember(&self, record: StoredRecord) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(record.id.clone(), record);
        }
    }

    /// Number of cached records.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl StorageGateway for CachedGateway {
    async fn put(&self, payload: Vec<u8>, metadata: Metadata) -> Result<RecordId, GatewayError> {
        self.inner.put(payload, metadata).await
    }

    async fn get(&self, id: &RecordId) -> Result<StoredRecord, GatewayError> {
        if let Some(record) = self.cached(id) {
            tracing::trace!(record_id = %id, "Record cache hit");
            return Ok(record);
        }
        let record = self.inner.get(id).await?;
        self.remember(record.clone());
        Ok(record)
    }

    async fn annotations_for(
        &self,
        original: &RecordId,
    ) -> Result<Vec<StoredRecord>, GatewayError> {
        self.inner.annotations_for(original).await
    }
}
