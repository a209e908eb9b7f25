// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Broadcast of an approved transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::builder::PendingTransaction;
use super::gate::AuthGrant;
use super::sources::NetworkBroadcaster;

/// Hex characters in a transaction hash body (32 bytes).
const TX_HASH_HEX_LEN: usize = 64;

/// A `0x`-prefixed 32-byte transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionHash(String);

impl TransactionHash {
    /// Parse a hash, normalising hex digits to lowercase.
    pub fn parse(raw: &str) -> Result<Self, SubmissionError> {
        let raw = raw.trim();
        let valid = raw
            .strip_prefix("0x")
            .is_some_and(|body| body.len() == TX_HASH_HEX_LEN && body.chars().all(|c| c.is_ascii_hexdigit()));
        if valid {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(SubmissionError::InvalidResponse(format!(
                "malformed transaction hash `{raw}`"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classified broadcast failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// Network or node trouble; the identical transaction may be retried.
    #[error("Broadcast failed: {0}")]
    Transient(String),

    /// The network refused the transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The node answered with something that is not a transaction hash.
    #[error("Invalid broadcast response: {0}")]
    InvalidResponse(String),

    /// No grant for this exact transaction; nothing was sent.
    #[error("Transaction was not authorized")]
    Unauthorized,
}

impl SubmissionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Transient(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SubmissionError::Transient(_) => "submission_transient",
            SubmissionError::Rejected(_) => "submission_rejected",
            SubmissionError::InvalidResponse(_) => "submission_invalid_response",
            SubmissionError::Unauthorized => "submission_unauthorized",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::Transient(_) => "could not reach the network, try again",
            SubmissionError::Rejected(_) => "the network rejected this transaction",
            SubmissionError::InvalidResponse(_) => "the network returned an unexpected response",
            SubmissionError::Unauthorized => "transaction was not authorized",
        }
    }
}

/// Successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub tx_hash: TransactionHash,
    pub submitted_at: DateTime<Utc>,
}

/// Sends approved transactions through the broadcaster.
pub struct TransactionSubmitter {
    broadcaster: Arc<dyn NetworkBroadcaster>,
}

impl TransactionSubmitter {
    pub fn new(broadcaster: Arc<dyn NetworkBroadcaster>) -> Self {
        Self { broadcaster }
    }

    /// Broadcast `transaction`. The grant must have been issued for this
    /// exact transaction.
    pub async fn submit(
        &self,
        transaction: &PendingTransaction,
        grant: &AuthGrant,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if !grant.covers(transaction) {
            tracing::error!(nonce = transaction.nonce(), "Refusing to broadcast without a matching grant");
            return Err(SubmissionError::Unauthorized);
        }

        let raw_hash = self.broadcaster.broadcast(transaction).await?;
        let tx_hash = TransactionHash::parse(&raw_hash)?;

        tracing::info!(tx_hash = %tx_hash, nonce = transaction.nonce(), "Transaction broadcast");
        Ok(SubmissionReceipt {
            tx_hash,
            submitted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send::gate::BiometricGate;
    use crate::send::testing::{pending_transaction, FakeAuthenticator, FakeBroadcaster, TX_HASH};

    async fn grant(tx: &PendingTransaction) -> AuthGrant {
        BiometricGate::new(Arc::new(FakeAuthenticator::approving()))
            .authenticate(tx)
            .await
            .unwrap()
    }

    #[test]
    fn hash_must_be_prefixed_32_bytes() {
        let hash = TransactionHash::parse(&TX_HASH.to_uppercase().replacen("0X", "0x", 1)).unwrap();
        assert_eq!(hash.as_str(), TX_HASH);
        assert_eq!(hash.as_str().len(), 66);

        assert!(TransactionHash::parse("0x1234").is_err());
        assert!(TransactionHash::parse(&TX_HASH[2..]).is_err());
    }

    #[tokio::test]
    async fn broadcasts_and_returns_hash() {
        let broadcaster = Arc::new(FakeBroadcaster::succeeding());
        let submitter = TransactionSubmitter::new(broadcaster.clone());
        let tx = pending_transaction(9).await;

        let receipt = submitter.submit(&tx, &grant(&tx).await).await.unwrap();
        assert_eq!(receipt.tx_hash.as_str(), TX_HASH);
        assert_eq!(broadcaster.broadcasts(), vec![tx]);
    }

    #[tokio::test]
    async fn mismatched_grant_never_reaches_the_network() {
        let broadcaster = Arc::new(FakeBroadcaster::succeeding());
        let submitter = TransactionSubmitter::new(broadcaster.clone());
        let approved = pending_transaction(1).await;
        let other = pending_transaction(2).await;

        let err = submitter.submit(&other, &grant(&approved).await).await.unwrap_err();
        assert_eq!(err, SubmissionError::Unauthorized);
        assert!(broadcaster.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_permanent_failure() {
        let broadcaster = Arc::new(FakeBroadcaster::succeeding());
        broadcaster.push_result(Ok("0xdeadbeef".to_string()));
        let submitter = TransactionSubmitter::new(broadcaster);
        let tx = pending_transaction(1).await;

        let err = submitter.submit(&tx, &grant(&tx).await).await.unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }
}
