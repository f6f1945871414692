// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance oracle: answers "what is this identity's balance" for
//! balance-gated policies.
//!
//! - [`EvmBalanceOracle`] - native balance over EVM JSON-RPC
//! - [`FixedBalanceOracle`] - static table, for tests and local runs
//! - [`UnconfiguredOracle`] - every lookup fails; used when no RPC is set

pub mod evm;

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use evm::EvmBalanceOracle;

/// Errors from a balance lookup.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Balance query failed: {0}")]
    Query(String),

    #[error("No balance oracle is configured")]
    NotConfigured,
}

/// Source of caller balances.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn balance_of(&self, identity: &str) -> Result<Decimal, OracleError>;
}

/// Oracle backed by a fixed identity → balance table.
///
/// Unknown identities are rejected rather than read as zero.
#[derive(Debug, Clone, Default)]
pub struct FixedBalanceOracle {
    balances: HashMap<String, Decimal>,
}

impl FixedBalanceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, identity: impl Into<String>, balance: Decimal) -> Self {
        self.balances.insert(identity.into(), balance);
        self
    }
}

#[async_trait]
impl BalanceOracle for FixedBalanceOracle {
    async fn balance_of(&self, identity: &str) -> Result<Decimal, OracleError> {
        self.balances
            .get(identity)
            .copied()
            .ok_or_else(|| {
                OracleError::InvalidIdentity(format!("no balance recorded for {identity}"))
            })
    }
}

/// Placeholder used when no balance source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredOracle;

#[async_trait]
impl BalanceOracle for UnconfiguredOracle {
    async fn balance_of(&self, _identity: &str) -> Result<Decimal, OracleError> {
        Err(OracleError::NotConfigured)
    }
}
