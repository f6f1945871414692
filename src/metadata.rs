// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Metadata
//!
//! Every record on the storage network carries an ordered list of string
//! tags. The tag names below are the wire format shared with the storage
//! gateway and with records written by other clients, so they must be
//! reproduced byte-for-byte.
//!
//! Tags are set once when a record is created and never change afterwards.
//! [`Metadata`] enforces unique names: inserting an existing name replaces
//! the value in place and keeps the original position.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wire tag names.
pub mod keys {
    // ========== Encryption Envelope ==========

    pub const ENCRYPTED: &str = "Encrypted";
    pub const ENCRYPTION_METHOD: &str = "Encryption-Method";
    pub const SALT: &str = "Salt";
    pub const IV: &str = "IV";
    /// HMAC over `iv || ciphertext`. Absent on records written without it.
    pub const AUTH_TAG: &str = "Auth-Tag";

    // ========== Access Policy ==========

    pub const DATA_CONTRACT: &str = "Data-Contract";
    pub const ACCESS_CONTROL: &str = "Access-Control";
    pub const VALID_FROM: &str = "Valid-From";
    pub const VALID_UNTIL: &str = "Valid-Until";
    pub const REQUIRED_BALANCE: &str = "Required-Balance";
    pub const ALLOWED_USERS: &str = "Allowed-Users";
    pub const MAX_DOWNLOADS: &str = "Max-Downloads";

    // ========== Ownership ==========

    pub const OWNER: &str = "Owner";

    // ========== Lifecycle Annotations ==========

    pub const DELETED: &str = "Deleted";
    pub const DELETED_AT: &str = "Deleted-At";
    pub const PERMANENT: &str = "Permanent";
    pub const DELETED_BY: &str = "Deleted-By";
    pub const RESTORED: &str = "Restored";
    pub const RESTORED_AT: &str = "Restored-At";
    pub const RESTORED_BY: &str = "Restored-By";
    pub const SHARE_REVOKED: &str = "Share-Revoked";
    pub const REVOKED_AT: &str = "Revoked-At";
    pub const REVOKED_USER: &str = "Revoked-User";
    pub const REVOKE_ALL: &str = "Revoke-All";
    pub const ROLLBACK_TO: &str = "Rollback-To";
    pub const ORIGINAL_TRANSACTION: &str = "Original-Transaction";
    pub const BACKUP_OF: &str = "Backup-Of";
    pub const BACKUP_AT: &str = "Backup-At";
    pub const DOWNLOAD_OF: &str = "Download-Of";
    pub const DOWNLOADED_AT: &str = "Downloaded-At";
    pub const DOWNLOADED_BY: &str = "Downloaded-By";

    /// Tags written by the vault itself. Callers may not supply these as
    /// free-form extra tags on upload.
    pub const RESERVED: &[&str] = &[
        ENCRYPTED,
        ENCRYPTION_METHOD,
        SALT,
        IV,
        AUTH_TAG,
        DATA_CONTRACT,
        ACCESS_CONTROL,
        VALID_FROM,
        VALID_UNTIL,
        REQUIRED_BALANCE,
        ALLOWED_USERS,
        MAX_DOWNLOADS,
        OWNER,
        DELETED,
        DELETED_AT,
        PERMANENT,
        DELETED_BY,
        RESTORED,
        RESTORED_AT,
        RESTORED_BY,
        SHARE_REVOKED,
        REVOKED_AT,
        REVOKED_USER,
        REVOKE_ALL,
        ROLLBACK_TO,
        ORIGINAL_TRANSACTION,
        BACKUP_OF,
        BACKUP_AT,
        DOWNLOAD_OF,
        DOWNLOADED_AT,
        DOWNLOADED_BY,
    ];

    /// Tags that describe a record's lifecycle position rather than its
    /// content. Stripped when content metadata is carried to a new version.
    pub const LIFECYCLE: &[&str] = &[
        DELETED,
        DELETED_AT,
        PERMANENT,
        DELETED_BY,
        RESTORED,
        RESTORED_AT,
        RESTORED_BY,
        SHARE_REVOKED,
        REVOKED_AT,
        REVOKED_USER,
        REVOKE_ALL,
        ROLLBACK_TO,
        ORIGINAL_TRANSACTION,
        BACKUP_OF,
        BACKUP_AT,
        DOWNLOAD_OF,
        DOWNLOADED_AT,
        DOWNLOADED_BY,
    ];

    /// Returns true if `name` is written by the vault.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED.contains(&name)
    }
}

/// Wire value for boolean tags.
pub const TRUE: &str = "true";
pub const FALSE: &str = "false";

/// A single name/value tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// Ordered tag list with unique names.
///
/// Deserialization collapses duplicate names, keeping the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct Metadata(Vec<Tag>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, replacing the value of an existing tag with the same name.
    ///
    /// Returns the previous value if one was replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|tag| tag.name == name) {
            Some(tag) => Some(std::mem::replace(&mut tag.value, value)),
            None => {
                self.0.push(Tag { name, value });
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True only when the tag is present with the exact value `"true"`.
    pub fn is_true(&self, name: &str) -> bool {
        self.get(name) == Some(TRUE)
    }

    /// Merge another tag list into this one. Later values win.
    pub fn extend(&mut self, other: Metadata) {
        for tag in other.0 {
            self.insert(tag.name, tag.value);
        }
    }

    /// Keep only tags whose name satisfies the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|tag| keep(&tag.name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|tag| (tag.name.as_str(), tag.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (name, value) in iter {
            metadata.insert(name, value);
        }
        metadata
    }
}

impl From<Vec<Tag>> for Metadata {
    fn from(tags: Vec<Tag>) -> Self {
        tags.into_iter().map(|tag| (tag.name, tag.value)).collect()
    }
}

impl From<Metadata> for Vec<Tag> {
    fn from(metadata: Metadata) -> Self {
        metadata.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut metadata = Metadata::new()
            .with("Content-Type", "text/plain")
            .with(keys::ENCRYPTED, TRUE);

        let previous = metadata.insert("Content-Type", "application/json");

        assert_eq!(previous.as_deref(), Some("text/plain"));
        assert_eq!(metadata.len(), 2);
        let names: Vec<&str> = metadata.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Content-Type", keys::ENCRYPTED]);
        assert_eq!(metadata.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn from_tags_deduplicates() {
        let metadata = Metadata::from(vec![
            Tag {
                name: "A".into(),
                value: "1".into(),
            },
            Tag {
                name: "A".into(),
                value: "2".into(),
            },
        ]);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("A"), Some("2"));
    }

    #[test]
    fn is_true_requires_exact_value() {
        let metadata = Metadata::new()
            .with(keys::DATA_CONTRACT, "TRUE")
            .with(keys::ENCRYPTED, TRUE);
        assert!(!metadata.is_true(keys::DATA_CONTRACT));
        assert!(metadata.is_true(keys::ENCRYPTED));
        assert!(!metadata.is_true(keys::DELETED));
    }

    #[test]
    fn serializes_as_tag_list() {
        let metadata = Metadata::new().with(keys::SALT, "00ff");
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"[{"name":"Salt","value":"00ff"}]"#);

        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn lifecycle_keys_are_reserved() {
        for key in keys::LIFECYCLE {
            assert!(keys::is_reserved(key), "{key} should be reserved");
        }
        assert!(!keys::is_reserved("Content-Type"));
    }
}
