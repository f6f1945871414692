// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local gateway.
//!
//! Records are kept in creation order, which doubles as the order reported
//! by `annotations_for`. Nothing is persisted across restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GatewayError, RecordId, StorageGateway, StoredRecord};
use crate::metadata::{keys, Metadata};

#[derive(Default)]
struct Log {
    records: Vec<StoredRecord>,
    by_id: HashMap<RecordId, usize>,
}

/// In-memory append-only record log.
#[derive(Default)]
pub struct InMemoryGateway {
    log: RwLock<Log>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records written so far.
    pub async fn len(&self) -> usize {
        self.log.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn put(&self, payload: Vec<u8>, metadata: Metadata) -> Result<RecordId, GatewayError> {
        let id = RecordId::new(Uuid::new_v4().to_string());
        let mut log = self.log.write().await;
        let index = log.records.len();
        log.records.push(StoredRecord {
            id: id.clone(),
            payload,
            metadata,
        });
        log.by_id.insert(id.clone(), index);
        tracing::debug!(record_id = %id, "Stored record in memory");
        Ok(id)
    }

    async fn get(&self, id: &RecordId) -> Result<StoredRecord, GatewayError> {
        let log = self.log.read().await;
        log.by_id
            .get(id)
            .map(|&index| log.records[index].clone())
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }

    async fn annotations_for(
        &self,
        original: &RecordId,
    ) -> Result<Vec<StoredRecord>, GatewayError> {
        let log = self.log.read().await;
        Ok(log
            .records
            .iter()
            .filter(|record| record.metadata.get(keys::ORIGINAL_TRANSACTION) == Some(original.as_str()))
            .cloned()
            .collect())
    }
}
