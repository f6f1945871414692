// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Lifecycle operations written as annotation records.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::annotation::Annotation;
use super::state::LogicalState;
use super::{LifecycleError, LifecycleStep};
use crate::gateway::{RecordId, StorageGateway};
use crate::metadata::keys;

/// Ids written by a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RollbackOutcome {
    /// The new current version.
    #[schema(value_type = String)]
    pub new_id: RecordId,
    /// Backup pointer written before the rollback, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub backup_id: Option<RecordId>,
}

/// Writes and reads lifecycle annotations through a gateway.
///
/// Every operation is one or more `put` calls. Multi-step operations run
/// strictly in sequence because later writes reference earlier ids.
pub struct LifecycleEmulator<'a> {
    gateway: &'a dyn StorageGateway,
}

impl<'a> LifecycleEmulator<'a> {
    pub fn new(gateway: &'a dyn StorageGateway) -> Self {
        Self { gateway }
    }

    async fn annotate(
        &self,
        id: &RecordId,
        annotation: Annotation,
    ) -> Result<RecordId, LifecycleError> {
        let annotation_id = self
            .gateway
            .put(Vec::new(), annotation.to_metadata(id))
            .await?;
        tracing::info!(
            record_id = %id,
            annotation_id = %annotation_id,
            kind = annotation.kind(),
            "Wrote lifecycle annotation"
        );
        Ok(annotation_id)
    }

    /// Map any record of a logical record to its original id.
    ///
    /// Rollback versions and annotations point back through
    /// `Original-Transaction`. Fails with `NotFound` when `id` does not
    /// exist, so nothing is ever written against a missing record.
    pub async fn resolve(&self, id: &RecordId) -> Result<RecordId, LifecycleError> {
        let record = self.gateway.get(id).await?;
        Ok(match record.metadata.get(keys::ORIGINAL_TRANSACTION) {
            Some(original) => RecordId::from(original),
            None => record.id,
        })
    }

    /// Fold the annotation log for `id`.
    pub async fn state(&self, id: &RecordId) -> Result<LogicalState, LifecycleError> {
        let records = self.gateway.annotations_for(id).await?;
        LogicalState::fold(id.clone(), &records)
            .map_err(|(id, reason)| LifecycleError::MalformedAnnotation { id, reason })
    }

    pub async fn mark_deleted(
        &self,
        id: &RecordId,
        permanent: bool,
        actor: Option<&str>,
    ) -> Result<RecordId, LifecycleError> {
        let id = &self.resolve(id).await?;
        self.annotate(
            id,
            Annotation::Deleted {
                at: now(),
                permanent,
                by: actor.map(str::to_string),
            },
        )
        .await
    }

    /// Write a restoration.
    ///
    /// Restoring a record with no observed deletion is allowed and logged.
    /// Restoring after a permanent deletion is refused.
    pub async fn restore(
        &self,
        id: &RecordId,
        actor: Option<&str>,
    ) -> Result<RecordId, LifecycleError> {
        let id = &self.resolve(id).await?;
        let state = self.state(id).await?;
        if state.permanent {
            return Err(LifecycleError::PermanentlyDeleted(id.clone()));
        }
        if !state.deleted {
            tracing::warn!(record_id = %id, "Restoring a record that is not deleted");
        }

        self.annotate(
            id,
            Annotation::Restored {
                at: now(),
                by: actor.map(str::to_string),
            },
        )
        .await
    }

    pub async fn revoke_share(
        &self,
        id: &RecordId,
        user: Option<&str>,
        revoke_all: bool,
        actor: Option<&str>,
    ) -> Result<RecordId, LifecycleError> {
        let user = user.map(str::trim).filter(|u| !u.is_empty());
        if user.is_none() && !revoke_all {
            return Err(LifecycleError::EmptyRevocation);
        }
        let id = &self.resolve(id).await?;
        if let Some(actor) = actor {
            tracing::debug!(record_id = %id, actor, "Share revocation requested");
        }

        self.annotate(
            id,
            Annotation::ShareRevoked {
                at: now(),
                user: user.map(str::to_string),
                revoke_all,
            },
        )
        .await
    }

    /// Write a pointer to the current version of `id`.
    pub async fn backup(&self, id: &RecordId) -> Result<RecordId, LifecycleError> {
        let state = self.state(id).await?;
        self.annotate(
            id,
            Annotation::Backup {
                of: state.current_version,
                at: now(),
            },
        )
        .await
    }

    /// Count one download of `version` against `id`.
    pub async fn record_download(
        &self,
        id: &RecordId,
        version: &RecordId,
        caller: Option<&str>,
    ) -> Result<RecordId, LifecycleError> {
        self.annotate(
            id,
            Annotation::DownloadRecorded {
                of: version.clone(),
                at: now(),
                by: caller.map(str::to_string),
            },
        )
        .await
    }

    /// Make a copy of `target` the current version of `id`.
    ///
    /// `target` must be `id` itself or an earlier rollback version of it.
    /// The new record carries the target's payload and content tags.
    ///
    /// With `create_backup`, a backup pointer to the pre-rollback version is
    /// written first. If that lands and the rollback write fails, the
    /// backup cannot be retracted and the error names its id.
    pub async fn rollback(
        &self,
        id: &RecordId,
        target: &RecordId,
        create_backup: bool,
    ) -> Result<RollbackOutcome, LifecycleError> {
        let id = &self.resolve(id).await?;
        let source = self.gateway.get(target).await?;
        let in_lineage = target == id
            || (source.metadata.get(keys::ORIGINAL_TRANSACTION) == Some(id.as_str())
                && source.metadata.contains(keys::ROLLBACK_TO));
        if !in_lineage {
            return Err(LifecycleError::UnrelatedVersion {
                id: id.clone(),
                target: target.clone(),
            });
        }

        let backup_id = if create_backup {
            Some(self.backup(id).await?)
        } else {
            None
        };

        let mut metadata = source.metadata;
        metadata.retain(|name| !keys::LIFECYCLE.contains(&name));
        metadata.extend(Annotation::Rollback { to: target.clone() }.to_metadata(id));

        let new_id = match self.gateway.put(source.payload, metadata).await {
            Ok(new_id) => new_id,
            Err(source) => {
                return Err(match backup_id {
                    Some(completed_id) => {
                        tracing::error!(
                            record_id = %id,
                            backup_id = %completed_id,
                            error = %source,
                            "Rollback failed after backup was written"
                        );
                        LifecycleError::Partial {
                            completed: LifecycleStep::Backup,
                            completed_id,
                            failed: LifecycleStep::Rollback,
                            source,
                        }
                    }
                    None => LifecycleError::Gateway(source),
                })
            }
        };

        tracing::info!(
            record_id = %id,
            target = %target,
            new_id = %new_id,
            "Rolled back record"
        );
        Ok(RollbackOutcome { new_id, backup_id })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
