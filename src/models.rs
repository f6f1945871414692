// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Payload bytes travel as
//! standard base64 strings.
//!
//! ## Model Categories
//!
//! - **Records**: protected upload, download and access checks
//! - **Lifecycle**: delete, restore, share revocation and rollback

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::gateway::RecordId;
use crate::metadata::Metadata;
use crate::policy::AccessPolicy;
use crate::vault::{DownloadedRecord, UploadRequest};

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadRecordRequest {
    /// Base64-encoded file contents.
    pub payload: String,
    /// Encrypt under this password. Omit to store plaintext.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub policy: Option<AccessPolicy>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Extra content tags such as `Content-Type`.
    #[serde(default)]
    pub tags: Metadata,
}

impl UploadRecordRequest {
    /// Decode the payload and convert to a vault request.
    pub fn into_upload(self) -> Result<UploadRequest, String> {
        let payload = Base64::decode_vec(&self.payload)
            .map_err(|e| format!("payload is not valid base64: {e}"))?;
        Ok(UploadRequest {
            payload,
            password: self.password,
            policy: self.policy,
            owner: self.owner,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadRecordRequest {
    #[serde(default)]
    pub password: Option<String>,
    /// Caller identity evaluated against the record's policy.
    #[serde(default)]
    pub caller: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadRecordResponse {
    #[schema(value_type = String)]
    pub id: RecordId,
    /// Version served; differs from `id` after a rollback.
    #[schema(value_type = String)]
    pub version: RecordId,
    /// Base64-encoded plaintext.
    pub payload: String,
    pub tags: Metadata,
}

impl From<DownloadedRecord> for DownloadRecordResponse {
    fn from(record: DownloadedRecord) -> Self {
        Self {
            id: record.id,
            version: record.version,
            payload: Base64::encode_string(&record.payload),
            tags: record.tags,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccessCheckRequest {
    #[serde(default)]
    pub caller: Option<String>,
    /// Evaluate at this instant (epoch ms) instead of now.
    #[serde(default)]
    pub at: Option<i64>,
}

// =============================================================================
// Lifecycle
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeleteRecordRequest {
    #[serde(default)]
    pub permanent: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RestoreRecordRequest {
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RevokeShareRequest {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub revoke_all: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RollbackRecordRequest {
    /// Version to restore: the record itself or an earlier rollback of it.
    #[schema(value_type = String)]
    pub target: RecordId,
    #[serde(default)]
    pub create_backup: bool,
}

/// Id of a written annotation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnnotationResponse {
    #[schema(value_type = String)]
    pub annotation_id: RecordId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_request_decodes_base64() {
        let request: UploadRecordRequest =
            serde_json::from_str(r#"{"payload":"aGVsbG8=","tags":[{"name":"A","value":"b"}]}"#)
                .unwrap();
        let upload = request.into_upload().unwrap();
        assert_eq!(upload.payload, b"hello");
        assert_eq!(upload.tags.get("A"), Some("b"));
        assert!(upload.password.is_none());
    }

    #[test]
    fn upload_request_rejects_bad_base64() {
        let request: UploadRecordRequest =
            serde_json::from_str(r#"{"payload":"not base64!"}"#).unwrap();
        assert!(request.into_upload().is_err());
    }

    #[test]
    fn optional_fields_default() {
        let request: RevokeShareRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.revoke_all);
        assert!(request.user.is_none());

        let request: RollbackRecordRequest =
            serde_json::from_str(r#"{"target":"tx-1"}"#).unwrap();
        assert!(!request.create_backup);
        assert_eq!(request.target, RecordId::from("tx-1"));
    }
}
