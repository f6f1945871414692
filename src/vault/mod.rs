// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Protected Vault
//!
//! Orchestrates protected uploads and downloads:
//!
//! ```text
//! upload:   validate → encrypt → attach policy tags → put
//! download: fold lifecycle → get current version → revocation check
//!           → policy evaluation → quota → decrypt → record download
//! ```
//!
//! The vault holds no mutable state of its own. Everything it knows about a
//! record comes from the gateway on each call.

pub mod service;

use serde::Serialize;
use utoipa::ToSchema;

use crate::envelope::EnvelopeError;
use crate::gateway::{GatewayError, RecordId};
use crate::lifecycle::LifecycleError;
use crate::metadata::Metadata;
use crate::policy::{AccessPolicy, MalformedPolicyError};

pub use service::ProtectedVault;

/// Input to [`ProtectedVault::upload_protected`].
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub payload: Vec<u8>,
    /// Encrypt the payload under this password.
    pub password: Option<String>,
    pub policy: Option<AccessPolicy>,
    /// Identity written to the `Owner` tag.
    pub owner: Option<String>,
    /// Free-form content tags. Reserved names are rejected.
    pub tags: Metadata,
}

impl UploadRequest {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::default()
        }
    }

    pub fn encrypted_with(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name, value);
        self
    }
}

/// Result of a protected upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UploadReceipt {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<AccessPolicy>,
}

/// Input to [`ProtectedVault::download_protected`].
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub password: Option<String>,
    pub caller: Option<String>,
    /// Evaluation instant in epoch milliseconds.
    pub now_ms: i64,
}

/// Plaintext of a record's current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedRecord {
    /// Logical record id that was requested.
    pub id: RecordId,
    /// Version actually read (differs from `id` after a rollback).
    pub version: RecordId,
    pub payload: Vec<u8>,
    /// Content tags of the version read, with vault tags removed.
    pub tags: Metadata,
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    MalformedPolicy(#[from] MalformedPolicyError),

    #[error("Access denied: {reason}")]
    PolicyDenied { reason: String },

    #[error("Record {id} has been deleted")]
    RecordDeleted { id: RecordId, permanent: bool },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Internal error: {0}")]
    Internal(String),
}
