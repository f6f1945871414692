// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Vault - Encrypted, Policy-Gated Records
//!
//! Password-based encryption and conditional-access policies for files kept
//! on an append-only storage network that has no update or delete primitive.
//!
//! ## Modules
//!
//! - `metadata` - Wire tag names and the ordered tag map
//! - `envelope` - scrypt + AES-256-CBC encryption envelope
//! - `policy` - Access policy model, tag codec and evaluator
//! - `lifecycle` - Delete/restore/revoke/rollback as annotation records
//! - `gateway` - Storage gateway trait and implementations
//! - `oracle` - Caller balance lookups
//! - `vault` - Protected upload/download orchestration
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod metadata;
pub mod models;
pub mod oracle;
pub mod policy;
pub mod state;
pub mod vault;
