// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction preparation.
//!
//! The builder re-validates everything the field validators already checked,
//! against a fresh balance snapshot, because the UI state may be stale by the
//! time the user picks a fee tier.

use std::sync::Arc;

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;

use super::gas::{GasFeeTier, SIMPLE_TRANSFER_GAS_LIMIT};
use super::sources::{AccountSource, BalanceSource, SourceError};
use super::validation::{parse_positive_amount, AddressValidator, NATIVE_DECIMALS};
use crate::blockchain::parse_amount;

/// Decimals of a gwei-denominated price when expressed in wei.
const GWEI_DECIMALS: u8 = 9;

/// Immutable, fully assembled transfer awaiting authentication and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    recipient: String,
    amount: Decimal,
    #[serde(serialize_with = "serialize_u256")]
    amount_wei: U256,
    fee: GasFeeTier,
    max_fee_per_gas_wei: u128,
    gas_limit: u64,
    nonce: u64,
}

fn serialize_u256<S: serde::Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

impl PendingTransaction {
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn amount_wei(&self) -> U256 {
        self.amount_wei
    }

    pub fn fee(&self) -> &GasFeeTier {
        &self.fee
    }

    pub fn max_fee_per_gas_wei(&self) -> u128 {
        self.max_fee_per_gas_wei
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Amount plus the selected fee, in native token.
    pub fn total_native(&self) -> Decimal {
        self.amount + self.fee.fee_native
    }
}

/// Why a prepare step was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Recipient address is not valid")]
    InvalidAddress,

    #[error("Amount is not valid")]
    InvalidAmount,

    #[error("Insufficient balance: {required} required, {available} available")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(SourceError),

    #[error("Nonce unavailable: {0}")]
    NonceUnavailable(SourceError),
}

impl BuildError {
    pub fn error_code(&self) -> &'static str {
        match self {
            BuildError::InvalidAddress => "build_invalid_address",
            BuildError::InvalidAmount => "build_invalid_amount",
            BuildError::InsufficientBalance { .. } => "build_insufficient_balance",
            BuildError::BalanceUnavailable(_) => "build_balance_unavailable",
            BuildError::NonceUnavailable(_) => "build_nonce_unavailable",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            BuildError::InvalidAddress => "enter a valid address",
            BuildError::InvalidAmount => "enter a valid amount",
            BuildError::InsufficientBalance { .. } => "insufficient balance to cover amount and fee",
            BuildError::BalanceUnavailable(_) | BuildError::NonceUnavailable(_) => {
                "cannot prepare transaction, check network"
            }
        }
    }
}

/// Assembles [`PendingTransaction`]s.
pub struct TransactionBuilder {
    balances: Arc<dyn BalanceSource>,
    accounts: Arc<dyn AccountSource>,
}

impl TransactionBuilder {
    pub fn new(balances: Arc<dyn BalanceSource>, accounts: Arc<dyn AccountSource>) -> Self {
        Self { balances, accounts }
    }

    /// Re-validate the inputs and assemble a transaction with a fresh nonce.
    pub async fn build(
        &self,
        address: &str,
        amount_text: &str,
        selected_fee: &GasFeeTier,
    ) -> Result<PendingTransaction, BuildError> {
        if !AddressValidator::validate(address).is_valid() {
            return Err(BuildError::InvalidAddress);
        }
        let amount = parse_positive_amount(amount_text).ok_or(BuildError::InvalidAmount)?;

        let balance = self
            .balances
            .current_balance()
            .await
            .map_err(BuildError::BalanceUnavailable)?;
        let required = amount
            .checked_add(selected_fee.fee_native)
            .ok_or(BuildError::InvalidAmount)?;
        if required > balance {
            return Err(BuildError::InsufficientBalance {
                required,
                available: balance,
            });
        }

        let amount_wei = parse_amount(&amount.normalize().to_string(), NATIVE_DECIMALS)
            .map_err(|_| BuildError::InvalidAmount)?;
        let max_fee_per_gas_wei: u128 =
            parse_amount(&selected_fee.fee_price_gwei.normalize().to_string(), GWEI_DECIMALS)
                .ok()
                .and_then(|wei| wei.try_into().ok())
                .ok_or(BuildError::InvalidAmount)?;

        let nonce = self
            .accounts
            .next_nonce()
            .await
            .map_err(BuildError::NonceUnavailable)?;

        tracing::debug!(
            recipient = %address.trim(),
            amount = %amount,
            speed = %selected_fee.speed,
            nonce,
            "Prepared pending transaction"
        );

        Ok(PendingTransaction {
            recipient: address.trim().to_string(),
            amount,
            amount_wei,
            fee: selected_fee.clone(),
            max_fee_per_gas_wei,
            gas_limit: SIMPLE_TRANSFER_GAS_LIMIT,
            nonce,
        })
    }
}
