// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborator seams consumed by the send pipeline.
//!
//! Every external dependency of the flow (wallet balance, fee oracle, nonce
//! source, biometric subsystem, network broadcaster) is reached through one
//! of these traits. Each call is an explicit suspension point; none of them
//! is ever treated as fatal to the flow.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::builder::PendingTransaction;
use super::submitter::SubmissionError;

/// Failure of a balance, price or nonce lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed source value: {0}")]
    Malformed(String),
}

/// Read-only snapshot of the sending account's native balance.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn current_balance(&self) -> Result<Decimal, SourceError>;
}

/// Network fee and fiat price oracle.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current base fee per gas, in gwei.
    async fn current_base_fee_price(&self) -> Result<Decimal, SourceError>;

    /// Price of one native token in the display fiat currency.
    async fn native_token_price_in_fiat(&self) -> Result<Decimal, SourceError>;
}

/// Source of per-account transaction nonces.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn next_nonce(&self) -> Result<u64, SourceError>;
}

/// State of the platform biometric subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometryAvailability {
    Available,
    Unavailable,
    NotEnrolled,
}

/// Platform biometric prompt.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    async fn availability(&self) -> BiometryAvailability;

    /// Show the prompt. Returns `false` on cancel or failed match.
    async fn authenticate(&self, reason: &str) -> bool;
}

/// Signs and broadcasts a built transaction, returning the raw hash string.
#[async_trait]
pub trait NetworkBroadcaster: Send + Sync {
    async fn broadcast(&self, transaction: &PendingTransaction) -> Result<String, SubmissionError>;
}
