// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access decisions.
//!
//! ## Evaluation Order
//!
//! The first failing check wins:
//!
//! 1. No policy → allow
//! 2. `now < valid_from` → deny (not yet valid)
//! 3. `now > valid_until` → deny (expired)
//! 4. Non-empty `allowed_users` → deny without a caller, deny a non-member
//! 5. `required_balance` → deny without a caller or for an identity the
//!    oracle rejects, deny below it; a failed lookup is handled by
//!    [`BalanceFailureMode`]
//! 6. Allow
//!
//! Time and identity checks are local; the balance lookup is a network
//! round trip and only happens once they have passed.

use chrono::{DateTime, SecondsFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::model::AccessPolicy;
use crate::oracle::{BalanceOracle, OracleError};

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    pub allow: bool,
    /// Human-readable denial reason. Always `None` when allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allow: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: Some(reason.into()),
        }
    }
}

/// What to do when a balance-gated record is read and the caller's balance
/// cannot be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceFailureMode {
    /// Log and allow. Matches records written by existing clients.
    #[default]
    Allow,
    /// Deny until the balance can be read.
    Deny,
}

impl std::str::FromStr for BalanceFailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(BalanceFailureMode::Allow),
            "deny" => Ok(BalanceFailureMode::Deny),
            other => Err(format!("unknown balance failure mode `{other}`")),
        }
    }
}

/// Evaluates policies under a configured balance failure posture.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator {
    failure_mode: BalanceFailureMode,
}

impl PolicyEvaluator {
    pub fn new(failure_mode: BalanceFailureMode) -> Self {
        Self { failure_mode }
    }

    pub fn failure_mode(&self) -> BalanceFailureMode {
        self.failure_mode
    }

    /// Evaluate with an already-known caller balance.
    ///
    /// A missing `caller_balance` counts as a failed lookup when there is a
    /// caller, and as a missing identity otherwise.
    pub fn evaluate(
        &self,
        policy: Option<&AccessPolicy>,
        now_ms: i64,
        caller: Option<&str>,
        caller_balance: Option<Decimal>,
    ) -> Decision {
        let Some(policy) = policy else {
            return Decision::allow();
        };
        if let Err(denied) = check_local(policy, now_ms, caller) {
            return denied;
        }
        let Some(required) = policy.required_balance else {
            return Decision::allow();
        };
        let balance = match (caller_balance, caller) {
            (Some(balance), _) => Ok(balance),
            (None, None) => Err(BalanceUnavailable::NoIdentity),
            (None, Some(_)) => Err(BalanceUnavailable::Lookup("no balance supplied".to_string())),
        };
        self.check_balance(required, balance)
    }

    /// Evaluate, fetching the caller's balance from `oracle` only if every
    /// local check passed and the policy is balance-gated.
    pub async fn evaluate_with_oracle(
        &self,
        policy: Option<&AccessPolicy>,
        now_ms: i64,
        caller: Option<&str>,
        oracle: &dyn BalanceOracle,
    ) -> Decision {
        let Some(policy) = policy else {
            return Decision::allow();
        };
        if let Err(denied) = check_local(policy, now_ms, caller) {
            return denied;
        }
        let Some(required) = policy.required_balance else {
            return Decision::allow();
        };

        let balance = match caller {
            Some(identity) => oracle.balance_of(identity).await.map_err(|e| match e {
                OracleError::InvalidIdentity(detail) => BalanceUnavailable::InvalidIdentity {
                    identity: identity.to_string(),
                    detail,
                },
                other => BalanceUnavailable::Lookup(other.to_string()),
            }),
            None => Err(BalanceUnavailable::NoIdentity),
        };
        self.check_balance(required, balance)
    }

    fn check_balance(
        &self,
        required: Decimal,
        balance: Result<Decimal, BalanceUnavailable>,
    ) -> Decision {
        match balance {
            Ok(current) if current < required => Decision::deny(format!(
                "Insufficient balance: required {required}, current {current}"
            )),
            Ok(_) => Decision::allow(),
            Err(BalanceUnavailable::NoIdentity) => Decision::deny(format!(
                "Caller identity required: access requires a balance of {required}"
            )),
            Err(BalanceUnavailable::InvalidIdentity { identity, detail }) => {
                Decision::deny(format!(
                    "Caller {identity} has no balance to check (required {required}): {detail}"
                ))
            }
            Err(BalanceUnavailable::Lookup(detail)) => match self.failure_mode {
                BalanceFailureMode::Allow => {
                    tracing::warn!(
                        required = %required,
                        error = %detail,
                        "Caller balance unavailable, allowing access"
                    );
                    Decision::allow()
                }
                BalanceFailureMode::Deny => {
                    tracing::warn!(
                        required = %required,
                        error = %detail,
                        "Caller balance unavailable, denying access"
                    );
                    Decision::deny(format!(
                        "Balance could not be determined (required {required}): {detail}"
                    ))
                }
            },
        }
    }
}

/// Why a caller's balance could not be compared.
///
/// Only a failed lookup is subject to [`BalanceFailureMode`]; a caller
/// that cannot be looked up is always denied.
enum BalanceUnavailable {
    NoIdentity,
    InvalidIdentity { identity: String, detail: String },
    Lookup(String),
}

/// Evaluate with the default (permissive) balance failure mode.
pub fn evaluate(
    policy: Option<&AccessPolicy>,
    now_ms: i64,
    caller: Option<&str>,
    caller_balance: Option<Decimal>,
) -> Decision {
    PolicyEvaluator::default().evaluate(policy, now_ms, caller, caller_balance)
}

/// Quota check against an observed download count.
///
/// Returns `None` when the policy sets no quota or it has room left.
pub fn check_download_quota(policy: &AccessPolicy, observed: u64) -> Option<Decision> {
    let max = policy.max_downloads?;
    (observed >= max).then(|| {
        Decision::deny(format!(
            "Download limit reached: {observed} of {max} downloads used"
        ))
    })
}

/// Time window and identity checks.
fn check_local(policy: &AccessPolicy, now_ms: i64, caller: Option<&str>) -> Result<(), Decision> {
    if let Some(from) = policy.valid_from {
        if now_ms < from {
            return Err(Decision::deny(format!(
                "Access not yet valid. Available from {}",
                format_instant(from)
            )));
        }
    }

    if let Some(until) = policy.valid_until {
        if now_ms > until {
            return Err(Decision::deny(format!(
                "Access expired at {}",
                format_instant(until)
            )));
        }
    }

    if !policy.allowed_users.is_empty() {
        match caller {
            None => {
                return Err(Decision::deny(
                    "Caller identity required: access is limited to specific users",
                ))
            }
            Some(identity) if !policy.allowed_users.contains(identity) => {
                return Err(Decision::deny(format!(
                    "Caller {identity} is not authorized to access this record"
                )))
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Render epoch milliseconds as RFC 3339 (UTC, millisecond precision).
pub fn format_instant(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{ms}ms"))
}
