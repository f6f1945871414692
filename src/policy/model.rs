// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access policy types.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse access classification carried in the `Access-Control` tag.
///
/// The classification is descriptive: enforcement comes from the concrete
/// fields of [`AccessPolicy`], not from this label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccessControl {
    #[default]
    Public,
    Private,
    TimeBased,
    BalanceBased,
}

impl AccessControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessControl::Public => "public",
            AccessControl::Private => "private",
            AccessControl::TimeBased => "time-based",
            AccessControl::BalanceBased => "balance-based",
        }
    }
}

impl fmt::Display for AccessControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "public" => Ok(AccessControl::Public),
            "private" => Ok(AccessControl::Private),
            "time-based" => Ok(AccessControl::TimeBased),
            "balance-based" => Ok(AccessControl::BalanceBased),
            other => Err(format!("unknown access control `{other}`")),
        }
    }
}

/// Conditional-access policy attached to a record at creation time.
///
/// Fields left unset impose no restriction. An empty `allowed_users` set
/// means "anyone"; identities are compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct AccessPolicy {
    #[serde(default)]
    pub access_control: AccessControl,
    /// Epoch milliseconds before which access is denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<i64>,
    /// Epoch milliseconds after which access is denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<i64>,
    /// Minimum caller balance, as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "10.5")]
    pub required_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    #[schema(value_type = Vec<String>)]
    pub allowed_users: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_downloads: Option<u64>,
}

impl AccessPolicy {
    pub fn new(access_control: AccessControl) -> Self {
        Self {
            access_control,
            ..Self::default()
        }
    }

    pub fn valid_between(mut self, from_ms: i64, until_ms: i64) -> Self {
        self.valid_from = Some(from_ms);
        self.valid_until = Some(until_ms);
        self
    }

    pub fn valid_from(mut self, from_ms: i64) -> Self {
        self.valid_from = Some(from_ms);
        self
    }

    pub fn valid_until(mut self, until_ms: i64) -> Self {
        self.valid_until = Some(until_ms);
        self
    }

    pub fn requiring_balance(mut self, balance: Decimal) -> Self {
        self.required_balance = Some(balance);
        self
    }

    pub fn allowing<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_users.extend(users.into_iter().map(Into::into));
        self
    }

    pub fn max_downloads(mut self, max: u64) -> Self {
        self.max_downloads = Some(max);
        self
    }

    /// Check that the policy survives the comma-joined wire encoding.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Err(format!(
                    "valid_from ({from}) is after valid_until ({until})"
                ));
            }
        }
        for user in &self.allowed_users {
            if user.is_empty() || user.trim() != user || user.contains(',') {
                return Err(format!(
                    "allowed user `{user}` must be non-empty with no surrounding whitespace or commas"
                ));
            }
        }
        if let Some(balance) = self.required_balance {
            if balance.is_sign_negative() {
                return Err(format!("required balance {balance} is negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_control_parses_wire_values() {
        for ac in [
            AccessControl::Public,
            AccessControl::Private,
            AccessControl::TimeBased,
            AccessControl::BalanceBased,
        ] {
            assert_eq!(ac.as_str().parse::<AccessControl>().unwrap(), ac);
        }
        assert!("friends-only".parse::<AccessControl>().is_err());
    }

    #[test]
    fn serde_matches_wire_spelling() {
        let json = serde_json::to_string(&AccessControl::BalanceBased).unwrap();
        assert_eq!(json, "\"balance-based\"");
    }

    #[test]
    fn validate_rejects_comma_identities() {
        let policy = AccessPolicy::new(AccessControl::Private).allowing(["alice,bob"]);
        assert!(policy.validate().is_err());

        let policy = AccessPolicy::new(AccessControl::Private).allowing([" alice"]);
        assert!(policy.validate().is_err());

        let policy = AccessPolicy::new(AccessControl::Private).allowing(["alice", "bob"]);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let policy = AccessPolicy::new(AccessControl::TimeBased).valid_between(2_000, 1_000);
        assert!(policy.validate().is_err());
    }
}
