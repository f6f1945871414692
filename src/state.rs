// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::VaultConfig;
use crate::gateway::{CachedGateway, GatewayError, HttpGateway, InMemoryGateway, StorageGateway};
use crate::oracle::{BalanceOracle, EvmBalanceOracle, OracleError, UnconfiguredOracle};
use crate::policy::PolicyEvaluator;
use crate::vault::ProtectedVault;

/// Which collaborators the vault was wired to. Reported by health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backends {
    pub gateway: &'static str,
    pub oracle: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to configure storage gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Failed to configure balance oracle: {0}")]
    Oracle(#[from] OracleError),
}

#[derive(Clone)]
pub struct AppState {
    pub vault: ProtectedVault,
    pub backends: Backends,
}

impl AppState {
    pub fn new(vault: ProtectedVault, backends: Backends) -> Self {
        Self { vault, backends }
    }

    pub fn from_config(config: &VaultConfig) -> Result<Self, StateError> {
        let (gateway, gateway_kind) = match &config.gateway_url {
            Some(url) => {
                let http: Arc<dyn StorageGateway> =
                    Arc::new(HttpGateway::new(url, config.gateway_timeout)?);
                (http, "http")
            }
            None => {
                tracing::warn!("GATEWAY_URL not set, records are kept in memory only");
                let memory: Arc<dyn StorageGateway> = Arc::new(InMemoryGateway::new());
                (memory, "memory")
            }
        };
        let gateway: Arc<dyn StorageGateway> = if config.record_cache_size > 0 {
            Arc::new(CachedGateway::new(gateway, config.record_cache_size))
        } else {
            gateway
        };

        let (oracle, oracle_kind) = match &config.balance_rpc_url {
            Some(url) => {
                let evm: Arc<dyn BalanceOracle> = Arc::new(EvmBalanceOracle::new(url)?);
                (evm, "evm")
            }
            None => {
                let none: Arc<dyn BalanceOracle> = Arc::new(UnconfiguredOracle);
                (none, "unconfigured")
            }
        };

        let vault = ProtectedVault::new(gateway, oracle)
            .with_evaluator(PolicyEvaluator::new(config.balance_failure_mode))
            .enforce_download_quota(config.enforce_download_quota);

        Ok(Self::new(
            vault,
            Backends {
                gateway: gateway_kind,
                oracle: oracle_kind,
            },
        ))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            ProtectedVault::new(
                Arc::new(InMemoryGateway::new()),
                Arc::new(UnconfiguredOracle),
            ),
            Backends {
                gateway: "memory",
                oracle: "unconfigured",
            },
        )
    }
}
