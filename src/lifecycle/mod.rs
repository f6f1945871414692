// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Lifecycle over an Append-Only Store
//!
//! The storage network cannot update or delete. Delete, restore, share
//! revocation, rollback and backup are each written as a new annotation
//! record whose `Original-Transaction` tag names the record it applies to.
//! Readers fold the annotation log into a [`LogicalState`].
//!
//! Writes are irreversible. When a two-step operation fails after its first
//! write landed, [`LifecycleError::Partial`] names what was written.

pub mod annotation;
pub mod emulator;
pub mod state;

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::gateway::{GatewayError, RecordId};

pub use annotation::Annotation;
pub use emulator::{LifecycleEmulator, RollbackOutcome};
pub use state::LogicalState;

/// Steps of a multi-write lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStep {
    Backup,
    Rollback,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleStep::Backup => f.write_str("backup"),
            LifecycleStep::Rollback => f.write_str("rollback"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// An earlier write landed and a later one failed.
    #[error("{completed} {completed_id} was written but {failed} failed: {source}")]
    Partial {
        completed: LifecycleStep,
        completed_id: RecordId,
        failed: LifecycleStep,
        #[source]
        source: GatewayError,
    },

    #[error("Record {0} is permanently deleted")]
    PermanentlyDeleted(RecordId),

    #[error("Share revocation needs a user or revoke-all")]
    EmptyRevocation,

    #[error("Record {target} is not a version of {id}")]
    UnrelatedVersion { id: RecordId, target: RecordId },

    #[error("Malformed lifecycle annotation {id}: {reason}")]
    MalformedAnnotation { id: RecordId, reason: String },
}
