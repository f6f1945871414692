// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use zeroize::Zeroizing;

use super::{DownloadRequest, DownloadedRecord, UploadReceipt, UploadRequest, VaultError};
use crate::envelope::{self, EncryptionEnvelope};
use crate::gateway::{RecordId, StorageGateway, StoredRecord};
use crate::lifecycle::{LifecycleEmulator, LogicalState};
use crate::metadata::keys;
use crate::oracle::BalanceOracle;
use crate::policy::{self, AccessPolicy, Decision, PolicyEvaluator};

/// A record that passed every access check.
struct Authorized {
    /// Original id of the logical record.
    id: RecordId,
    state: LogicalState,
    record: StoredRecord,
    policy: Option<AccessPolicy>,
}

/// Protected upload/download over a storage gateway.
#[derive(Clone)]
pub struct ProtectedVault {
    gateway: Arc<dyn StorageGateway>,
    oracle: Arc<dyn BalanceOracle>,
    evaluator: PolicyEvaluator,
    enforce_download_quota: bool,
}

impl ProtectedVault {
    pub fn new(gateway: Arc<dyn StorageGateway>, oracle: Arc<dyn BalanceOracle>) -> Self {
        Self {
            gateway,
            oracle,
            evaluator: PolicyEvaluator::default(),
            enforce_download_quota: false,
        }
    }

    pub fn with_evaluator(mut self, evaluator: PolicyEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Count downloads and deny past `Max-Downloads`.
    pub fn enforce_download_quota(mut self, enforce: bool) -> Self {
        self.enforce_download_quota = enforce;
        self
    }

    pub fn gateway(&self) -> &dyn StorageGateway {
        self.gateway.as_ref()
    }

    pub fn lifecycle(&self) -> LifecycleEmulator<'_> {
        LifecycleEmulator::new(self.gateway.as_ref())
    }

    /// Encrypt (optionally), attach policy tags, and store.
    pub async fn upload_protected(
        &self,
        request: UploadRequest,
    ) -> Result<UploadReceipt, VaultError> {
        let UploadRequest {
            payload,
            password,
            policy,
            owner,
            tags,
        } = request;

        if let Some((name, _)) = tags.iter().find(|(name, _)| keys::is_reserved(name)) {
            return Err(VaultError::InvalidInput(format!(
                "tag `{name}` is reserved"
            )));
        }
        if let Some(policy) = &policy {
            policy.validate().map_err(VaultError::InvalidInput)?;
        }
        let owner = owner.map(|o| o.trim().to_string());
        if owner.as_deref() == Some("") {
            return Err(VaultError::InvalidInput("owner must not be empty".to_string()));
        }

        let mut metadata = tags;
        let (payload, encrypted) = match password {
            Some(password) => {
                let password = Zeroizing::new(password);
                if password.is_empty() {
                    return Err(VaultError::InvalidInput(
                        "password must not be empty".to_string(),
                    ));
                }
                let sealed = tokio::task::spawn_blocking(move || {
                    envelope::encrypt(&payload, password.as_str())
                })
                .await
                .map_err(|e| VaultError::Internal(format!("encryption task failed: {e}")))??;
                metadata.extend(sealed.envelope.to_metadata());
                (sealed.ciphertext, true)
            }
            None => (payload, false),
        };

        if let Some(policy) = &policy {
            metadata.extend(policy::encode(policy));
        }
        if let Some(owner) = &owner {
            metadata.insert(keys::OWNER, owner.as_str());
        }

        let id = self.gateway.put(payload, metadata).await?;
        tracing::info!(
            record_id = %id,
            encrypted,
            has_policy = policy.is_some(),
            "Uploaded protected record"
        );

        Ok(UploadReceipt {
            id,
            encrypted,
            policy,
        })
    }

    /// Resolve, authorize, decrypt.
    pub async fn download_protected(
        &self,
        id: &RecordId,
        request: DownloadRequest,
    ) -> Result<DownloadedRecord, VaultError> {
        let DownloadRequest {
            password,
            caller,
            now_ms,
        } = request;
        let password = password.map(Zeroizing::new);
        if password.as_ref().is_some_and(|p| p.is_empty()) {
            return Err(VaultError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }

        let Authorized {
            id,
            state,
            record,
            policy,
        } = self.authorize(id, caller.as_deref(), now_ms).await?;

        let payload = match EncryptionEnvelope::from_metadata(&record.metadata)? {
            Some(sealed_with) => {
                let password = password.ok_or_else(|| {
                    VaultError::InvalidInput("record is encrypted; a password is required".to_string())
                })?;
                let ciphertext = record.payload;
                tokio::task::spawn_blocking(move || {
                    envelope::decrypt(&ciphertext, password.as_str(), &sealed_with)
                })
                .await
                .map_err(|e| VaultError::Internal(format!("decryption task failed: {e}")))?
                .inspect_err(|_| {
                    tracing::warn!(record_id = %id, "Decryption failed");
                })?
            }
            None => record.payload,
        };

        if self.quota_applies(policy.as_ref()) {
            self.lifecycle()
                .record_download(&id, &record.id, caller.as_deref())
                .await?;
        }

        let mut tags = record.metadata;
        tags.retain(|name| !keys::is_reserved(name));

        Ok(DownloadedRecord {
            id,
            version: state.current_version,
            payload,
            tags,
        })
    }

    /// Decide whether `caller` could download `id` now, without reading
    /// the payload or recording anything.
    pub async fn check_access(
        &self,
        id: &RecordId,
        caller: Option<&str>,
        now_ms: i64,
    ) -> Result<Decision, VaultError> {
        match self.authorize(id, caller, now_ms).await {
            Ok(_) => Ok(Decision::allow()),
            Err(VaultError::PolicyDenied { reason }) => Ok(Decision::deny(reason)),
            Err(VaultError::RecordDeleted { permanent, .. }) => Ok(Decision::deny(if permanent {
                "Record has been permanently deleted"
            } else {
                "Record has been deleted"
            })),
            Err(e) => Err(e),
        }
    }

    /// Policy attached to the current version of `id`.
    pub async fn record_policy(&self, id: &RecordId) -> Result<Option<AccessPolicy>, VaultError> {
        let lifecycle = self.lifecycle();
        let state = lifecycle.state(&lifecycle.resolve(id).await?).await?;
        let record = self.gateway.get(&state.current_version).await?;
        Ok(policy::decode(&record.metadata)?)
    }

    /// Folded state of the logical record `id` belongs to.
    pub async fn state(&self, id: &RecordId) -> Result<LogicalState, VaultError> {
        let lifecycle = self.lifecycle();
        Ok(lifecycle.state(&lifecycle.resolve(id).await?).await?)
    }

    fn quota_applies(&self, policy: Option<&AccessPolicy>) -> bool {
        self.enforce_download_quota && policy.is_some_and(|p| p.max_downloads.is_some())
    }

    async fn authorize(
        &self,
        id: &RecordId,
        caller: Option<&str>,
        now_ms: i64,
    ) -> Result<Authorized, VaultError> {
        // Version ids are readable directly, but the lifecycle of the
        // original they belong to still applies.
        let lifecycle = self.lifecycle();
        let id = &lifecycle.resolve(id).await?;
        let state = lifecycle.state(id).await?;
        if state.deleted {
            tracing::debug!(record_id = %id, permanent = state.permanent, "Record is deleted");
            return Err(VaultError::RecordDeleted {
                id: id.clone(),
                permanent: state.permanent,
            });
        }

        let record = self.gateway.get(&state.current_version).await?;
        let owner = record.metadata.get(keys::OWNER);
        if state.is_share_revoked_for(caller, owner) {
            let reason = match caller {
                Some(caller) => format!("Share access revoked for {caller}"),
                None => "Share access revoked".to_string(),
            };
            tracing::info!(record_id = %id, reason = %reason, "Access denied");
            return Err(VaultError::PolicyDenied { reason });
        }

        let policy = policy::decode(&record.metadata)?;
        let mut decision = self
            .evaluator
            .evaluate_with_oracle(policy.as_ref(), now_ms, caller, self.oracle.as_ref())
            .await;
        if decision.allow && self.quota_applies(policy.as_ref()) {
            if let Some(denied) = policy
                .as_ref()
                .and_then(|p| policy::check_download_quota(p, state.downloads))
            {
                decision = denied;
            }
        }

        if !decision.allow {
            let reason = decision.reason.unwrap_or_else(|| "Access denied".to_string());
            tracing::info!(record_id = %id, reason = %reason, "Access denied");
            return Err(VaultError::PolicyDenied { reason });
        }

        Ok(Authorized {
            id: id.clone(),
            state,
            record,
            policy,
        })
    }
}
