// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction broadcasting for Avalanche C-Chain.
//!
//! This module signs prepared native AVAX transfers as EIP-1559
//! transactions and classifies node errors for the send flow's retry logic.

use std::str::FromStr;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;

use super::client::AvaxClientError;
use super::types::NetworkConfig;
use crate::send::{NetworkBroadcaster, PendingTransaction, SubmissionError};

/// Standard priority fee for Avalanche (1.5 gwei).
const PRIORITY_FEE_WEI: u128 = 1_500_000_000;

/// Node error fragments meaning the transaction itself was refused.
const REJECTION_MARKERS: &[&str] = &[
    "insufficient funds",
    "nonce too low",
    "already known",
    "underpriced",
    "intrinsic gas",
    "exceeds block gas limit",
    "less than block base fee",
    "fee cap",
];

type SigningProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::fillers::JoinFill<
            alloy::providers::Identity,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::GasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::BlobGasFiller,
                    alloy::providers::fillers::JoinFill<
                        alloy::providers::fillers::NonceFiller,
                        alloy::providers::fillers::ChainIdFiller,
                    >,
                >,
            >,
        >,
        alloy::providers::fillers::WalletFiller<EthereumWallet>,
    >,
    alloy::providers::RootProvider<alloy::network::Ethereum>,
>;

/// Signs and broadcasts prepared transfers with the wallet's key.
pub struct RpcBroadcaster {
    network: NetworkConfig,
    provider: SigningProvider,
}

impl RpcBroadcaster {
    /// Create a new broadcaster with signing capabilities.
    pub fn new(
        network: NetworkConfig,
        rpc_url: &str,
        wallet: EthereumWallet,
    ) -> Result<Self, AvaxClientError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| AvaxClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        Ok(Self { network, provider })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

/// EIP-1559 request carrying exactly what was prepared, so the fillers
/// have nothing left to choose.
fn transfer_request(transaction: &PendingTransaction, chain_id: u64) -> Result<TransactionRequest, SubmissionError> {
    let to = Address::from_str(transaction.recipient())
        .map_err(|e| SubmissionError::Rejected(format!("Invalid to address: {}", e)))?;
    let max_fee = transaction.max_fee_per_gas_wei();

    let mut request = TransactionRequest::default()
        .to(to)
        .value(transaction.amount_wei())
        .nonce(transaction.nonce())
        .gas_limit(transaction.gas_limit())
        .max_fee_per_gas(max_fee)
        .max_priority_fee_per_gas(PRIORITY_FEE_WEI.min(max_fee));
    request.chain_id = Some(chain_id);
    Ok(request)
}

/// Map a node error message onto the retry classification.
pub fn classify_rpc_error(message: &str) -> SubmissionError {
    let lowered = message.to_ascii_lowercase();
    if REJECTION_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        SubmissionError::Rejected(message.to_string())
    } else {
        SubmissionError::Transient(message.to_string())
    }
}

#[async_trait]
impl NetworkBroadcaster for RpcBroadcaster {
    async fn broadcast(&self, transaction: &PendingTransaction) -> Result<String, SubmissionError> {
        let request = transfer_request(transaction, self.network.chain_id)?;

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        tracing::info!(
            network = self.network.name,
            nonce = transaction.nonce(),
            tx_hash = %tx_hash,
            "Transaction broadcast"
        );
        Ok(tx_hash)
    }
}

/// Parse a human-readable amount to wei (or gwei-scaled units).
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for AVAX, 9 for a gwei price)
///
/// # Returns
/// * `Ok(U256)` - Amount in smallest unit
/// * `Err` - If parsing fails
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AvaxClientError> {
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 {
        return Err(AvaxClientError::InvalidAmount(
            "Invalid amount format".to_string(),
        ));
    }

    let whole = parts[0]
        .parse::<u128>()
        .map_err(|_| AvaxClientError::InvalidAmount("Invalid whole number".to_string()))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(AvaxClientError::InvalidAmount(format!(
                "Too many decimal places (max {})",
                decimals
            )));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| AvaxClientError::InvalidAmount("Invalid decimal".to_string()))?
    } else {
        0u128
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| AvaxClientError::InvalidAmount("Amount overflow".to_string()))?;

    Ok(U256::from(total))
}

/// Format wei to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
