// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Native-balance oracle over EVM JSON-RPC.

use std::str::FromStr;

use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{BalanceOracle, OracleError};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Decimals of a chain's native token (wei → whole units).
pub const NATIVE_DECIMALS: u8 = 18;

/// Reads native balances for 0x-addresses from an EVM RPC endpoint.
pub struct EvmBalanceOracle {
    rpc_url: String,
    provider: HttpProvider,
    decimals: u8,
}

impl EvmBalanceOracle {
    pub fn new(rpc_url: &str) -> Result<Self, OracleError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| OracleError::Query(format!("invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            provider,
            decimals: NATIVE_DECIMALS,
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl BalanceOracle for EvmBalanceOracle {
    async fn balance_of(&self, identity: &str) -> Result<Decimal, OracleError> {
        let addr = Address::from_str(identity)
            .map_err(|e| OracleError::InvalidIdentity(format!("{identity}: {e}")))?;

        let balance = self
            .provider
            .get_balance(addr)
            .await
            .map_err(|e| OracleError::Query(e.to_string()))?;

        balance_to_decimal(balance, self.decimals)
    }
}

/// Largest mantissa a [`Decimal`] can hold (96 bits).
const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Largest scale a [`Decimal`] can hold.
const MAX_SCALE: u32 = 28;

/// Convert a raw balance with `decimals` fractional digits into a
/// [`Decimal`] without rounding through a string.
///
/// Precision is kept in full unless the value exceeds the 96-bit mantissa,
/// in which case the least significant fractional digits are dropped.
fn balance_to_decimal(balance: U256, decimals: u8) -> Result<Decimal, OracleError> {
    let ten = U256::from(10u64);
    let mut mantissa = balance;
    let mut scale = u32::from(decimals);
    while scale > 0 && (scale > MAX_SCALE || mantissa > U256::from(MAX_MANTISSA)) {
        mantissa /= ten;
        scale -= 1;
    }

    let out_of_range = || OracleError::Query(format!("balance {balance} out of range"));
    let mantissa = u128::try_from(mantissa).map_err(|_| out_of_range())?;
    if mantissa > MAX_MANTISSA {
        return Err(out_of_range());
    }
    let mantissa = i128::try_from(mantissa).map_err(|_| out_of_range())?;
    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map(|d| d.normalize())
        .map_err(|e| OracleError::Query(format!("balance {balance} out of range: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_wei_to_whole_units() {
        let one = U256::from(1_000_000_000_000_000_000u64);
        assert_eq!(balance_to_decimal(one, 18).unwrap(), Decimal::ONE);

        let half = U256::from(500_000_000_000_000_000u64);
        assert_eq!(balance_to_decimal(half, 18).unwrap(), Decimal::new(5, 1));

        let complex = U256::from(1_234_567_890_000_000_000u64);
        assert_eq!(
            balance_to_decimal(complex, 18).unwrap(),
            Decimal::new(123_456_789, 8)
        );

        assert_eq!(balance_to_decimal(U256::ZERO, 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn tiny_balances_keep_their_precision() {
        let dust = balance_to_decimal(U256::from(500_000_000_000u64), 18).unwrap();
        assert_eq!(dust, Decimal::new(5, 7));
        assert!(dust >= Decimal::new(1, 7));

        let one_wei = balance_to_decimal(U256::from(1u64), 18).unwrap();
        assert_eq!(one_wei, Decimal::new(1, 18));
    }

    #[test]
    fn huge_balances_drop_trailing_digits() {
        // 10^30 wei: 10^12 whole units, beyond a 96-bit mantissa at scale 18.
        let huge = U256::from(10u64).pow(U256::from(30u64));
        let value = balance_to_decimal(huge, 18).unwrap();
        assert_eq!(value, Decimal::from(1_000_000_000_000u64));

        assert!(balance_to_decimal(U256::MAX, 18).is_err());
    }

    #[test]
    fn rejects_invalid_rpc_url() {
        assert!(EvmBalanceOracle::new("not a url").is_err());
    }

    #[tokio::test]
    async fn rejects_non_address_identity() {
        let oracle = EvmBalanceOracle::new("http://127.0.0.1:9").unwrap();
        let err = oracle.balance_of("alice").await.unwrap_err();
        assert!(matches!(err, OracleError::InvalidIdentity(_)));
    }
}
