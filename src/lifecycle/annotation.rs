// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lifecycle annotation records.
//!
//! Each annotation is its own record whose `Original-Transaction` tag points
//! at the logical record it changes. Only the metadata is meaningful;
//! payloads are empty except on rollback records, which carry the restored
//! version's bytes.

use crate::gateway::RecordId;
use crate::metadata::{keys, Metadata, FALSE, TRUE};

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Deleted {
        at: String,
        permanent: bool,
        by: Option<String>,
    },
    Restored {
        at: String,
        by: Option<String>,
    },
    ShareRevoked {
        at: String,
        user: Option<String>,
        revoke_all: bool,
    },
    /// New current version whose payload is a copy of `to`.
    Rollback { to: RecordId },
    /// Pointer to the version that was current before a rollback.
    Backup { of: RecordId, at: String },
    DownloadRecorded {
        of: RecordId,
        at: String,
        by: Option<String>,
    },
}

impl Annotation {
    /// Short name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Annotation::Deleted { .. } => "deleted",
            Annotation::Restored { .. } => "restored",
            Annotation::ShareRevoked { .. } => "share-revoked",
            Annotation::Rollback { .. } => "rollback",
            Annotation::Backup { .. } => "backup",
            Annotation::DownloadRecorded { .. } => "download",
        }
    }

    /// Wire tags for this annotation, keyed to `original`.
    pub fn to_metadata(&self, original: &RecordId) -> Metadata {
        let metadata = match self {
            Annotation::Deleted { at, permanent, by } => {
                let mut m = Metadata::new()
                    .with(keys::DELETED, TRUE)
                    .with(keys::DELETED_AT, at.as_str())
                    .with(keys::PERMANENT, if *permanent { TRUE } else { FALSE });
                if let Some(by) = by {
                    m.insert(keys::DELETED_BY, by.as_str());
                }
                m
            }
            Annotation::Restored { at, by } => {
                let mut m = Metadata::new()
                    .with(keys::RESTORED, TRUE)
                    .with(keys::RESTORED_AT, at.as_str());
                if let Some(by) = by {
                    m.insert(keys::RESTORED_BY, by.as_str());
                }
                m
            }
            Annotation::ShareRevoked {
                at,
                user,
                revoke_all,
            } => {
                let mut m = Metadata::new()
                    .with(keys::SHARE_REVOKED, TRUE)
                    .with(keys::REVOKED_AT, at.as_str());
                if let Some(user) = user {
                    m.insert(keys::REVOKED_USER, user.as_str());
                }
                if *revoke_all {
                    m.insert(keys::REVOKE_ALL, TRUE);
                }
                m
            }
            Annotation::Rollback { to } => Metadata::new().with(keys::ROLLBACK_TO, to.as_str()),
            Annotation::Backup { of, at } => Metadata::new()
                .with(keys::BACKUP_OF, of.as_str())
                .with(keys::BACKUP_AT, at.as_str()),
            Annotation::DownloadRecorded { of, at, by } => {
                let mut m = Metadata::new()
                    .with(keys::DOWNLOAD_OF, of.as_str())
                    .with(keys::DOWNLOADED_AT, at.as_str());
                if let Some(by) = by {
                    m.insert(keys::DOWNLOADED_BY, by.as_str());
                }
                m
            }
        };
        metadata.with(keys::ORIGINAL_TRANSACTION, original.as_str())
    }

    /// Classify a record's tags.
    ///
    /// `Ok(None)` means the record is not a lifecycle annotation (for example
    /// a content record that merely shares the `Original-Transaction` tag).
    pub fn from_metadata(metadata: &Metadata) -> Result<Option<Self>, String> {
        let at = |key: &str| metadata.get(key).unwrap_or_default().to_string();
        let by = |key: &str| {
            metadata
                .get(key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if metadata.is_true(keys::DELETED) {
            return Ok(Some(Annotation::Deleted {
                at: at(keys::DELETED_AT),
                permanent: metadata.is_true(keys::PERMANENT),
                by: by(keys::DELETED_BY),
            }));
        }
        if metadata.is_true(keys::RESTORED) {
            return Ok(Some(Annotation::Restored {
                at: at(keys::RESTORED_AT),
                by: by(keys::RESTORED_BY),
            }));
        }
        if metadata.is_true(keys::SHARE_REVOKED) {
            let user = by(keys::REVOKED_USER);
            let revoke_all = metadata.is_true(keys::REVOKE_ALL);
            if user.is_none() && !revoke_all {
                return Err("share revocation names neither a user nor Revoke-All".to_string());
            }
            return Ok(Some(Annotation::ShareRevoked {
                at: at(keys::REVOKED_AT),
                user,
                revoke_all,
            }));
        }
        if let Some(to) = metadata.get(keys::ROLLBACK_TO) {
            return pointer(keys::ROLLBACK_TO, to).map(|to| Some(Annotation::Rollback { to }));
        }
        if let Some(of) = metadata.get(keys::BACKUP_OF) {
            return pointer(keys::BACKUP_OF, of).map(|of| {
                Some(Annotation::Backup {
                    of,
                    at: at(keys::BACKUP_AT),
                })
            });
        }
        if let Some(of) = metadata.get(keys::DOWNLOAD_OF) {
            return pointer(keys::DOWNLOAD_OF, of).map(|of| {
                Some(Annotation::DownloadRecorded {
                    of,
                    at: at(keys::DOWNLOADED_AT),
                    by: by(keys::DOWNLOADED_BY),
                })
            });
        }
        Ok(None)
    }
}

fn pointer(key: &str, value: &str) -> Result<RecordId, String> {
    let value = value.trim();
    if value.is_empty() {
        Err(format!("{key} is empty"))
    } else {
        Ok(RecordId::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AT: &str = "2026-01-01T00:00:00.000Z";

    #[test]
    fn deleted_uses_wire_keys() {
        let original = RecordId::from("orig");
        let metadata = Annotation::Deleted {
            at: AT.to_string(),
            permanent: false,
            by: Some("alice".to_string()),
        }
        .to_metadata(&original);

        assert_eq!(metadata.get("Deleted"), Some("true"));
        assert_eq!(metadata.get("Deleted-At"), Some(AT));
        assert_eq!(metadata.get("Permanent"), Some("false"));
        assert_eq!(metadata.get("Deleted-By"), Some("alice"));
        assert_eq!(metadata.get("Original-Transaction"), Some("orig"));
    }

    #[test]
    fn annotations_survive_their_tags() {
        let original = RecordId::from("orig");
        let annotations = [
            Annotation::Deleted {
                at: AT.to_string(),
                permanent: true,
                by: None,
            },
            Annotation::Restored {
                at: AT.to_string(),
                by: Some("bob".to_string()),
            },
            Annotation::ShareRevoked {
                at: AT.to_string(),
                user: Some("carol".to_string()),
                revoke_all: false,
            },
            Annotation::ShareRevoked {
                at: AT.to_string(),
                user: None,
                revoke_all: true,
            },
            Annotation::Rollback {
                to: RecordId::from("v1"),
            },
            Annotation::Backup {
                of: RecordId::from("v2"),
                at: AT.to_string(),
            },
            Annotation::DownloadRecorded {
                of: RecordId::from("v2"),
                at: AT.to_string(),
                by: None,
            },
        ];
        for annotation in annotations {
            let parsed = Annotation::from_metadata(&annotation.to_metadata(&original)).unwrap();
            assert_eq!(parsed, Some(annotation));
        }
    }

    #[test]
    fn content_tags_are_not_annotations() {
        let metadata = Metadata::new()
            .with("Content-Type", "text/plain")
            .with(keys::ORIGINAL_TRANSACTION, "orig");
        assert_eq!(Annotation::from_metadata(&metadata).unwrap(), None);
    }

    #[test]
    fn revocation_without_target_is_malformed() {
        let metadata = Metadata::new()
            .with(keys::SHARE_REVOKED, TRUE)
            .with(keys::REVOKED_AT, AT);
        assert!(Annotation::from_metadata(&metadata).is_err());
    }

    #[test]
    fn empty_pointer_is_malformed() {
        let metadata = Metadata::new().with(keys::ROLLBACK_TO, " ");
        assert!(Annotation::from_metadata(&metadata).is_err());
    }
}
