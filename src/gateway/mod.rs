// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Gateway
//!
//! Abstraction over the append-only storage network. The network only
//! creates and reads records; there is no update or delete primitive, so
//! every state change elsewhere in the crate is a new record.
//!
//! ## Implementations
//!
//! - [`InMemoryGateway`] - process-local log for tests and local runs
//! - [`HttpGateway`] - forwards to a gateway service over HTTP
//! - [`CachedGateway`] - LRU cache in front of another gateway's `get`

pub mod cache;
pub mod http;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::metadata::Metadata;

pub use cache::CachedGateway;
pub use http::HttpGateway;
pub use memory::InMemoryGateway;

/// Opaque, gateway-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A record as stored on the network. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub payload: Vec<u8>,
    pub metadata: Metadata,
}

/// Errors from gateway calls. Propagated as-is; nothing here retries.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Gateway request failed: {0}")]
    Request(String),

    #[error("Gateway response was invalid: {0}")]
    InvalidResponse(String),

    /// The write may or may not have landed. Callers must not assume either.
    #[error("Outcome of gateway write is unknown: {0}")]
    UnknownOutcome(String),

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Create and read access to the storage network.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Store a new record and return its id.
    async fn put(&self, payload: Vec<u8>, metadata: Metadata) -> Result<RecordId, GatewayError>;

    /// Fetch a record by id.
    async fn get(&self, id: &RecordId) -> Result<StoredRecord, GatewayError>;

    /// Records whose `Original-Transaction` tag equals `original`, in the
    /// order the gateway reports them as created.
    async fn annotations_for(&self, original: &RecordId)
        -> Result<Vec<StoredRecord>, GatewayError>;
}
