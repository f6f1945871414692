// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current logical state of a record, folded from its annotation log.
//!
//! ## Fold Rules
//!
//! Annotations are applied in gateway-reported creation order:
//!
//! - **Deleted / Restored**: the latest one wins. A permanent deletion is
//!   terminal and later restorations are ignored.
//! - **Share-Revoked**: revocations accumulate and are never undone.
//! - **Rollback**: the latest rollback record is the current version.
//! - **Backup**: every backup pointer is kept.
//! - **Download**: each recorded download is counted.

use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;

use super::annotation::Annotation;
use crate::gateway::{RecordId, StoredRecord};

/// Folded view of one logical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LogicalState {
    /// The original record id the log is keyed by.
    #[schema(value_type = String)]
    pub id: RecordId,
    pub deleted: bool,
    pub permanent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    /// Version readers should fetch: the latest rollback record, or `id`.
    #[schema(value_type = String)]
    pub current_version: RecordId,
    /// Version the latest rollback copied from.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub rolled_back_to: Option<RecordId>,
    #[schema(value_type = Vec<String>)]
    pub revoked_users: BTreeSet<String>,
    pub revoke_all: bool,
    /// Backup annotation record ids, oldest first.
    #[schema(value_type = Vec<String>)]
    pub backups: Vec<RecordId>,
    pub downloads: u64,
    /// Number of annotation records folded.
    pub annotations: usize,
}

impl LogicalState {
    /// State of a record with no annotations.
    pub fn pristine(id: RecordId) -> Self {
        Self {
            current_version: id.clone(),
            id,
            deleted: false,
            permanent: false,
            deleted_at: None,
            deleted_by: None,
            rolled_back_to: None,
            revoked_users: BTreeSet::new(),
            revoke_all: false,
            backups: Vec::new(),
            downloads: 0,
            annotations: 0,
        }
    }

    /// Apply one annotation carried by the record `source`.
    pub fn apply(&mut self, source: &RecordId, annotation: &Annotation) {
        self.annotations += 1;
        match annotation {
            Annotation::Deleted { at, permanent, by } => {
                if self.permanent {
                    return;
                }
                self.deleted = true;
                self.permanent = *permanent;
                self.deleted_at = Some(at.clone());
                self.deleted_by = by.clone();
            }
            Annotation::Restored { .. } => {
                if self.permanent {
                    tracing::warn!(
                        record_id = %self.id,
                        annotation_id = %source,
                        "Ignoring restore after permanent deletion"
                    );
                    return;
                }
                self.deleted = false;
                self.deleted_at = None;
                self.deleted_by = None;
            }
            Annotation::ShareRevoked {
                user, revoke_all, ..
            } => {
                if let Some(user) = user {
                    self.revoked_users.insert(user.clone());
                }
                self.revoke_all |= *revoke_all;
            }
            Annotation::Rollback { to } => {
                self.current_version = source.clone();
                self.rolled_back_to = Some(to.clone());
            }
            Annotation::Backup { .. } => self.backups.push(source.clone()),
            Annotation::DownloadRecorded { .. } => self.downloads += 1,
        }
    }

    /// Fold an annotation log.
    ///
    /// Records that are not annotations are skipped. A record that looks
    /// like an annotation but cannot be parsed fails the fold.
    pub fn fold(id: RecordId, records: &[StoredRecord]) -> Result<Self, (RecordId, String)> {
        let mut state = Self::pristine(id);
        for record in records {
            match Annotation::from_metadata(&record.metadata) {
                Ok(Some(annotation)) => state.apply(&record.id, &annotation),
                Ok(None) => {}
                Err(reason) => return Err((record.id.clone(), reason)),
            }
        }
        Ok(state)
    }

    /// Whether `caller` has lost share access. The owner never does.
    pub fn is_share_revoked_for(&self, caller: Option<&str>, owner: Option<&str>) -> bool {
        if owner.is_some() && caller == owner {
            return false;
        }
        if self.revoke_all {
            return true;
        }
        caller.is_some_and(|c| self.revoked_users.contains(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;

    const AT: &str = "2026-01-01T00:00:00.000Z";

    fn record(id: &str, annotation: Annotation) -> StoredRecord {
        StoredRecord {
            id: RecordId::from(id),
            payload: Vec::new(),
            metadata: annotation.to_metadata(&RecordId::from("orig")),
        }
    }

    fn deleted(permanent: bool) -> Annotation {
        Annotation::Deleted {
            at: AT.to_string(),
            permanent,
            by: None,
        }
    }

    fn restored() -> Annotation {
        Annotation::Restored {
            at: AT.to_string(),
            by: None,
        }
    }

    fn fold(records: &[StoredRecord]) -> LogicalState {
        LogicalState::fold(RecordId::from("orig"), records).unwrap()
    }

    #[test]
    fn empty_log_is_pristine() {
        let state = fold(&[]);
        assert!(!state.deleted);
        assert_eq!(state.current_version, RecordId::from("orig"));
        assert_eq!(state.annotations, 0);
    }

    #[test]
    fn latest_delete_or_restore_wins() {
        let state = fold(&[record("a1", deleted(false))]);
        assert!(state.deleted);

        let state = fold(&[record("a1", deleted(false)), record("a2", restored())]);
        assert!(!state.deleted);

        let state = fold(&[
            record("a1", deleted(false)),
            record("a2", restored()),
            record("a3", deleted(false)),
        ]);
        assert!(state.deleted);
    }

    #[test]
    fn permanent_deletion_is_terminal() {
        let state = fold(&[record("a1", deleted(true)), record("a2", restored())]);
        assert!(state.deleted);
        assert!(state.permanent);
    }

    #[test]
    fn revocations_accumulate() {
        let revoke = |user: &str| Annotation::ShareRevoked {
            at: AT.to_string(),
            user: Some(user.to_string()),
            revoke_all: false,
        };
        let state = fold(&[record("a1", revoke("alice")), record("a2", revoke("bob"))]);

        assert!(state.is_share_revoked_for(Some("alice"), None));
        assert!(state.is_share_revoked_for(Some("bob"), None));
        assert!(!state.is_share_revoked_for(Some("carol"), None));
        assert!(!state.is_share_revoked_for(None, None));
    }

    #[test]
    fn revoke_all_spares_only_the_owner() {
        let state = fold(&[record(
            "a1",
            Annotation::ShareRevoked {
                at: AT.to_string(),
                user: None,
                revoke_all: true,
            },
        )]);
        assert!(state.is_share_revoked_for(Some("carol"), Some("owner")));
        assert!(state.is_share_revoked_for(None, Some("owner")));
        assert!(!state.is_share_revoked_for(Some("owner"), Some("owner")));
    }

    #[test]
    fn last_rollback_is_current_version() {
        let state = fold(&[
            record(
                "v2",
                Annotation::Rollback {
                    to: RecordId::from("orig"),
                },
            ),
            record(
                "bk",
                Annotation::Backup {
                    of: RecordId::from("v2"),
                    at: AT.to_string(),
                },
            ),
            record(
                "v3",
                Annotation::Rollback {
                    to: RecordId::from("v2"),
                },
            ),
        ]);
        assert_eq!(state.current_version, RecordId::from("v3"));
        assert_eq!(state.rolled_back_to, Some(RecordId::from("v2")));
        assert_eq!(state.backups, vec![RecordId::from("bk")]);
    }

    #[test]
    fn downloads_are_counted() {
        let download = || Annotation::DownloadRecorded {
            of: RecordId::from("orig"),
            at: AT.to_string(),
            by: None,
        };
        let state = fold(&[record("d1", download()), record("d2", download())]);
        assert_eq!(state.downloads, 2);
    }

    #[test]
    fn malformed_annotation_fails_the_fold() {
        let bad = StoredRecord {
            id: RecordId::from("bad"),
            payload: Vec::new(),
            metadata: Metadata::new().with(crate::metadata::keys::SHARE_REVOKED, "true"),
        };
        let (id, _) = LogicalState::fold(RecordId::from("orig"), &[bad]).unwrap_err();
        assert_eq!(id, RecordId::from("bad"));
    }
}
