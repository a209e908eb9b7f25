// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Avalanche C-Chain client backing the send flow's read-side sources.

use std::str::FromStr;
use std::sync::Mutex;

use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::BlockNumberOrTag,
};
use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::transactions::format_amount;
use super::types::*;
use crate::send::{AccountSource, BalanceSource, PriceSource, SourceError};

/// HTTP provider type for Avalanche C-Chain (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Base fee assumed when the latest block carries none.
const FALLBACK_BASE_FEE_GWEI: u64 = 25;

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Priority fee folded into the reference price (1.5 gwei).
const PRIORITY_FEE_WEI: u128 = 1_500_000_000;

/// Price the fee tiers scale from: `2 * base + priority`, so even the
/// slowest tier stays above the current base fee.
pub(crate) fn reference_gas_price_wei(base_fee_wei: u128) -> u128 {
    base_fee_wei
        .saturating_mul(2)
        .saturating_add(PRIORITY_FEE_WEI)
}

/// Avalanche C-Chain client bound to the sending account.
pub struct AvaxClient {
    /// Network configuration
    network: NetworkConfig,
    /// Alloy HTTP provider
    provider: HttpProvider,
    account: Address,
    /// Fiat value of one AVAX, when an oracle rate is configured
    fiat_rate: Option<Decimal>,
    /// Lowest nonce that may be handed out next
    nonce_floor: Mutex<u64>,
}

impl AvaxClient {
    /// Create a client for `account` talking to `rpc_url`.
    pub fn new(network: NetworkConfig, rpc_url: &str, account: &str) -> Result<Self, AvaxClientError> {
        let url: url::Url = rpc_url.parse().map_err(|e: url::ParseError| {
            AvaxClientError::InvalidRpcUrl(e.to_string())
        })?;
        let account = Address::from_str(account)
            .map_err(|e| AvaxClientError::InvalidAddress(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            network,
            provider,
            account,
            fiat_rate: None,
            nonce_floor: Mutex::new(0),
        })
    }

    /// Create a client for Avalanche Fuji testnet on the public endpoint.
    pub fn fuji(account: &str) -> Result<Self, AvaxClientError> {
        Self::new(AVAX_FUJI, AVAX_FUJI.rpc_url, account)
    }

    pub fn with_fiat_rate(mut self, rate: Option<Decimal>) -> Self {
        self.fiat_rate = rate;
        self
    }

    /// Get the native AVAX balance of the sending account, in wei.
    pub async fn get_native_balance(&self) -> Result<U256, AvaxClientError> {
        self.provider
            .get_balance(self.account)
            .await
            .map_err(|e| AvaxClientError::RpcError(e.to_string()))
    }

    /// Base fee of the latest block, in wei.
    pub async fn get_base_fee(&self) -> Result<u128, AvaxClientError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| AvaxClientError::RpcError(format!("Failed to get block: {}", e)))?
            .ok_or_else(|| AvaxClientError::RpcError("No latest block".to_string()))?;

        Ok(block
            .header
            .base_fee_per_gas
            .map(u128::from)
            .unwrap_or(u128::from(FALLBACK_BASE_FEE_GWEI * WEI_PER_GWEI)))
    }

    /// Pending transaction count of the sending account.
    pub async fn get_pending_nonce(&self) -> Result<u64, AvaxClientError> {
        self.provider
            .get_transaction_count(self.account)
            .pending()
            .await
            .map_err(|e| AvaxClientError::RpcError(e.to_string()))
    }

    fn issue_nonce(&self, chain: u64) -> Result<u64, SourceError> {
        let mut floor = self
            .nonce_floor
            .lock()
            .map_err(|_| SourceError::Unavailable("nonce state poisoned".to_string()))?;
        let nonce = chain.max(*floor);
        *floor = nonce + 1;
        Ok(nonce)
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

#[async_trait]
impl BalanceSource for AvaxClient {
    async fn current_balance(&self) -> Result<Decimal, SourceError> {
        let wei = self
            .get_native_balance()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        wei_to_decimal(wei)
    }
}

#[async_trait]
impl PriceSource for AvaxClient {
    async fn current_base_fee_price(&self) -> Result<Decimal, SourceError> {
        let base_fee = self
            .get_base_fee()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let wei = reference_gas_price_wei(base_fee);
        let wei = Decimal::from_u128(wei)
            .ok_or_else(|| SourceError::Malformed(format!("base fee {wei} out of range")))?;
        Ok(wei / Decimal::from(WEI_PER_GWEI))
    }

    async fn native_token_price_in_fiat(&self) -> Result<Decimal, SourceError> {
        self.fiat_rate
            .ok_or_else(|| SourceError::Unavailable("no fiat rate configured".to_string()))
    }
}

#[async_trait]
impl AccountSource for AvaxClient {
    /// Pending count from the node, never lower than the last nonce issued
    /// plus one, so two builds before a broadcast do not collide.
    ///
    /// Nonces are strictly increasing per client, so a build discarded before
    /// broadcast (fee re-selection, an edit after prepare) leaves its nonce
    /// unused. Transactions issued after it wait behind that gap on chain; a
    /// fresh client starts again from the node's pending count.
    async fn next_nonce(&self) -> Result<u64, SourceError> {
        let chain = self
            .get_pending_nonce()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let nonce = self.issue_nonce(chain)?;
        tracing::debug!(account = %self.account, chain, nonce, "Issued nonce");
        Ok(nonce)
    }
}

fn wei_to_decimal(wei: U256) -> Result<Decimal, SourceError> {
    let formatted = format_amount(wei, 18);
    Decimal::from_str(&formatted)
        .map_err(|e| SourceError::Malformed(format!("balance {formatted}: {e}")))
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum AvaxClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    RpcError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ACCOUNT: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12";

    #[test]
    fn converts_wei_to_decimal() {
        let one_and_half = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(wei_to_decimal(one_and_half).unwrap(), dec!(1.5));

        assert_eq!(wei_to_decimal(U256::from(1u64)).unwrap(), dec!(0.000000000000000001));
        assert_eq!(wei_to_decimal(U256::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn new_rejects_bad_inputs() {
        assert!(matches!(
            AvaxClient::new(AVAX_FUJI, "not a url", ACCOUNT),
            Err(AvaxClientError::InvalidRpcUrl(_))
        ));
        assert!(matches!(
            AvaxClient::new(AVAX_FUJI, AVAX_FUJI.rpc_url, "0x1234"),
            Err(AvaxClientError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn fiat_rate_comes_from_config() {
        let client = AvaxClient::fuji(ACCOUNT).unwrap();
        assert!(client.native_token_price_in_fiat().await.is_err());

        let client = client.with_fiat_rate(Some(dec!(31.40)));
        assert_eq!(client.native_token_price_in_fiat().await.unwrap(), dec!(31.40));
        assert_eq!(client.network().chain_id, 43113);
    }

    #[test]
    fn reference_price_keeps_slow_tier_above_base_fee() {
        let base_fee = 25_000_000_000u128;
        let reference = reference_gas_price_wei(base_fee);
        assert_eq!(reference, 51_500_000_000);
        // slow tier scales the reference by 0.8
        assert!(reference * 8 / 10 >= base_fee);
    }

    #[tokio::test]
    async fn nonce_floor_never_goes_backwards() {
        let client = AvaxClient::fuji(ACCOUNT).unwrap();
        assert_eq!(client.issue_nonce(5).unwrap(), 5);
        // node has not seen the first build yet
        assert_eq!(client.issue_nonce(5).unwrap(), 6);
        assert_eq!(client.issue_nonce(9).unwrap(), 9);
    }
}
