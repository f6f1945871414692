// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Policy ⇄ metadata encoding.
//!
//! A record carries a policy only when `Data-Contract` is exactly `"true"`.
//! Absent optional tags mean "no restriction"; present tags that fail to
//! parse are an error, never a silent default.

use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::model::{AccessControl, AccessPolicy};
use crate::metadata::{keys, Metadata, TRUE};

/// Separator for the `Allowed-Users` list.
pub const USER_SEPARATOR: char = ',';

/// A policy tag was present but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed policy tag {key} = {value:?}: {reason}")]
pub struct MalformedPolicyError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Render a policy as wire tags, omitting unset fields.
pub fn encode(policy: &AccessPolicy) -> Metadata {
    let mut metadata = Metadata::new()
        .with(keys::DATA_CONTRACT, TRUE)
        .with(keys::ACCESS_CONTROL, policy.access_control.as_str());

    if let Some(from) = policy.valid_from {
        metadata.insert(keys::VALID_FROM, from.to_string());
    }
    if let Some(until) = policy.valid_until {
        metadata.insert(keys::VALID_UNTIL, until.to_string());
    }
    if let Some(balance) = policy.required_balance {
        metadata.insert(keys::REQUIRED_BALANCE, balance.to_string());
    }
    if !policy.allowed_users.is_empty() {
        let joined = policy
            .allowed_users
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&USER_SEPARATOR.to_string());
        metadata.insert(keys::ALLOWED_USERS, joined);
    }
    if let Some(max) = policy.max_downloads {
        metadata.insert(keys::MAX_DOWNLOADS, max.to_string());
    }

    metadata
}

/// Reconstruct a policy from a record's tags.
///
/// Returns `Ok(None)` when the record carries no data contract, meaning
/// access is unrestricted.
pub fn decode(metadata: &Metadata) -> Result<Option<AccessPolicy>, MalformedPolicyError> {
    if !metadata.is_true(keys::DATA_CONTRACT) {
        return Ok(None);
    }

    let access_control = match metadata.get(keys::ACCESS_CONTROL) {
        Some(raw) => raw
            .parse::<AccessControl>()
            .map_err(|reason| malformed(keys::ACCESS_CONTROL, raw, reason))?,
        None => AccessControl::Public,
    };

    let allowed_users: BTreeSet<String> = metadata
        .get(keys::ALLOWED_USERS)
        .map(|raw| {
            raw.split(USER_SEPARATOR)
                .map(str::trim)
                .filter(|user| !user.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(AccessPolicy {
        access_control,
        valid_from: parse_field::<i64>(metadata, keys::VALID_FROM)?,
        valid_until: parse_field::<i64>(metadata, keys::VALID_UNTIL)?,
        required_balance: parse_field::<Decimal>(metadata, keys::REQUIRED_BALANCE)?,
        allowed_users,
        max_downloads: parse_field::<u64>(metadata, keys::MAX_DOWNLOADS)?,
    }))
}

fn parse_field<T>(metadata: &Metadata, key: &'static str) -> Result<Option<T>, MalformedPolicyError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    metadata
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| malformed(key, raw, e.to_string()))
        })
        .transpose()
}

fn malformed(key: &'static str, value: &str, reason: impl Into<String>) -> MalformedPolicyError {
    MalformedPolicyError {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}
