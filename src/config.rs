// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `GATEWAY_URL` | Base URL of the storage gateway | In-memory gateway |
//! | `GATEWAY_TIMEOUT_SECS` | Per-request gateway timeout | `30` |
//! | `RECORD_CACHE_SIZE` | Records kept in the read cache (`0` disables) | `256` |
//! | `BALANCE_RPC_URL` | EVM JSON-RPC endpoint for balance checks | Balance unavailable |
//! | `VAULT_BALANCE_FAILURE_MODE` | `allow` or `deny` when a balance cannot be read | `allow` |
//! | `VAULT_ENFORCE_DOWNLOAD_QUOTA` | Count downloads and enforce `Max-Downloads` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::str::FromStr;
use std::time::Duration;

use crate::policy::BalanceFailureMode;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Storage gateway base URL.
///
/// When unset, records live in process memory and are lost on restart.
pub const GATEWAY_URL_ENV: &str = "GATEWAY_URL";

/// Gateway request timeout in seconds.
///
/// A write that times out is reported as "unknown outcome": the gateway may
/// still have committed it.
pub const GATEWAY_TIMEOUT_SECS_ENV: &str = "GATEWAY_TIMEOUT_SECS";

pub const RECORD_CACHE_SIZE_ENV: &str = "RECORD_CACHE_SIZE";

/// EVM JSON-RPC endpoint used to read caller balances.
pub const BALANCE_RPC_URL_ENV: &str = "BALANCE_RPC_URL";

pub const BALANCE_FAILURE_MODE_ENV: &str = "VAULT_BALANCE_FAILURE_MODE";
pub const ENFORCE_DOWNLOAD_QUOTA_ENV: &str = "VAULT_ENFORCE_DOWNLOAD_QUOTA";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RECORD_CACHE_SIZE: usize = 256;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub host: String,
    pub port: u16,
    pub gateway_url: Option<String>,
    pub gateway_timeout: Duration,
    pub record_cache_size: usize,
    pub balance_rpc_url: Option<String>,
    pub balance_failure_mode: BalanceFailureMode,
    pub enforce_download_quota: bool,
    pub log_format: LogFormat,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            gateway_url: None,
            gateway_timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
            record_cache_size: DEFAULT_RECORD_CACHE_SIZE,
            balance_rpc_url: None,
            balance_failure_mode: BalanceFailureMode::default(),
            enforce_download_quota: false,
            log_format: LogFormat::default(),
        }
    }
}

impl VaultConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let timeout_secs: u64 = parse(GATEWAY_TIMEOUT_SECS_ENV, get(GATEWAY_TIMEOUT_SECS_ENV))?
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: GATEWAY_TIMEOUT_SECS_ENV,
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        Ok(Self {
            host: get(HOST_ENV).unwrap_or(defaults.host),
            port: parse(PORT_ENV, get(PORT_ENV))?.unwrap_or(defaults.port),
            gateway_url: get(GATEWAY_URL_ENV),
            gateway_timeout: Duration::from_secs(timeout_secs),
            record_cache_size: parse(RECORD_CACHE_SIZE_ENV, get(RECORD_CACHE_SIZE_ENV))?
                .unwrap_or(defaults.record_cache_size),
            balance_rpc_url: get(BALANCE_RPC_URL_ENV),
            balance_failure_mode: parse(BALANCE_FAILURE_MODE_ENV, get(BALANCE_FAILURE_MODE_ENV))?
                .unwrap_or(defaults.balance_failure_mode),
            enforce_download_quota: parse(
                ENFORCE_DOWNLOAD_QUOTA_ENV,
                get(ENFORCE_DOWNLOAD_QUOTA_ENV),
            )?
            .unwrap_or(false),
            log_format: parse(LOG_FORMAT_ENV, get(LOG_FORMAT_ENV))?.unwrap_or(defaults.log_format),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            let parsed = raw.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value: raw,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<VaultConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VaultConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]).unwrap(), VaultConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("GATEWAY_URL", "http://gateway:8000"),
            ("GATEWAY_TIMEOUT_SECS", "5"),
            ("RECORD_CACHE_SIZE", "0"),
            ("BALANCE_RPC_URL", "http://rpc:8545"),
            ("VAULT_BALANCE_FAILURE_MODE", "deny"),
            ("VAULT_ENFORCE_DOWNLOAD_QUOTA", "true"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_address(), "127.0.0.1:9000");
        assert_eq!(cfg.gateway_url.as_deref(), Some("http://gateway:8000"));
        assert_eq!(cfg.gateway_timeout, Duration::from_secs(5));
        assert_eq!(cfg.record_cache_size, 0);
        assert_eq!(cfg.balance_rpc_url.as_deref(), Some("http://rpc:8545"));
        assert_eq!(cfg.balance_failure_mode, BalanceFailureMode::Deny);
        assert!(cfg.enforce_download_quota);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("GATEWAY_URL", "  "), ("PORT", "")]).unwrap();
        assert_eq!(cfg.gateway_url, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config(&[("VAULT_BALANCE_FAILURE_MODE", "sometimes")]).unwrap_err();
        assert!(err.to_string().contains("VAULT_BALANCE_FAILURE_MODE"));

        assert!(config(&[("GATEWAY_TIMEOUT_SECS", "0")]).is_err());
    }
}
