// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Conditional Access Policies
//!
//! Policies are encoded as flat metadata tags at upload time and can never
//! be changed on that record. Changing a policy means uploading a new record
//! and annotating the old one as superseded.
//!
//! - [`model`] - `AccessPolicy` and `AccessControl`
//! - [`codec`] - tag encoding and decoding
//! - [`evaluator`] - allow/deny decisions with reasons

pub mod codec;
pub mod evaluator;
pub mod model;

pub use codec::{decode, encode, MalformedPolicyError};
pub use evaluator::{
    check_download_quota, evaluate, format_instant, BalanceFailureMode, Decision, PolicyEvaluator,
};
pub use model::{AccessControl, AccessPolicy};
