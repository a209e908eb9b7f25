// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Biometric confirmation gate.
//!
//! A successful prompt yields an [`AuthGrant`] bound to the exact
//! [`PendingTransaction`] the user approved. The grant cannot be built
//! outside this module, so the submitter cannot be reached without one.

use std::sync::Arc;

use super::builder::PendingTransaction;
use super::sources::{BiometricAuthenticator, BiometryAvailability};

/// Proof that the user approved one specific transaction.
#[derive(Debug)]
pub struct AuthGrant {
    authorized: PendingTransaction,
}

impl AuthGrant {
    /// Whether this grant was issued for `transaction`.
    pub fn covers(&self, transaction: &PendingTransaction) -> bool {
        self.authorized == *transaction
    }
}

/// Why the gate refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Biometric authentication is unavailable on this device")]
    Unavailable,

    #[error("No biometric identity is enrolled")]
    NotEnrolled,

    #[error("Biometric authentication was cancelled or failed")]
    Declined,
}

impl AuthenticationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthenticationError::Unavailable => "auth_unavailable",
            AuthenticationError::NotEnrolled => "auth_not_enrolled",
            AuthenticationError::Declined => "auth_declined",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthenticationError::Unavailable => {
                "authentication unavailable, transaction not sent"
            }
            AuthenticationError::NotEnrolled => {
                "set up biometric authentication to send, transaction not sent"
            }
            AuthenticationError::Declined => "authentication failed, transaction not sent",
        }
    }
}

/// Wraps the platform authenticator.
pub struct BiometricGate {
    authenticator: Arc<dyn BiometricAuthenticator>,
}

impl BiometricGate {
    pub fn new(authenticator: Arc<dyn BiometricAuthenticator>) -> Self {
        Self { authenticator }
    }

    /// Prompt the user to approve `transaction`.
    pub async fn authenticate(
        &self,
        transaction: &PendingTransaction,
    ) -> Result<AuthGrant, AuthenticationError> {
        match self.authenticator.availability().await {
            BiometryAvailability::Available => {}
            BiometryAvailability::Unavailable => return Err(AuthenticationError::Unavailable),
            BiometryAvailability::NotEnrolled => return Err(AuthenticationError::NotEnrolled),
        }

        let reason = format!(
            "Send {} AVAX to {}",
            transaction.amount().normalize(),
            transaction.recipient()
        );
        if !self.authenticator.authenticate(&reason).await {
            return Err(AuthenticationError::Declined);
        }

        tracing::info!(nonce = transaction.nonce(), "Biometric approval granted");
        Ok(AuthGrant {
            authorized: transaction.clone(),
        })
    }

    /// Boolean form of [`BiometricGate::authenticate`].
    pub async fn authenticate_bool(&self, transaction: &PendingTransaction) -> bool {
        self.authenticate(transaction).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send::testing::{pending_transaction, FakeAuthenticator};

    #[tokio::test]
    async fn grant_is_bound_to_the_approved_transaction() {
        let auth = Arc::new(FakeAuthenticator::approving());
        let gate = BiometricGate::new(auth.clone());
        let tx = pending_transaction(3).await;
        let other = pending_transaction(4).await;

        let grant = gate.authenticate(&tx).await.unwrap();
        assert!(grant.covers(&tx));
        assert!(!grant.covers(&other));
        assert_eq!(auth.prompts(), 1);
    }

    #[tokio::test]
    async fn declined_prompt_fails() {
        let gate = BiometricGate::new(Arc::new(FakeAuthenticator::declining()));
        let tx = pending_transaction(1).await;

        assert_eq!(
            gate.authenticate(&tx).await.unwrap_err(),
            AuthenticationError::Declined
        );
        assert!(!gate.authenticate_bool(&tx).await);
    }

    #[tokio::test]
    async fn unavailable_biometry_skips_the_prompt() {
        for (availability, expected) in [
            (BiometryAvailability::Unavailable, AuthenticationError::Unavailable),
            (BiometryAvailability::NotEnrolled, AuthenticationError::NotEnrolled),
        ] {
            let auth = Arc::new(FakeAuthenticator::approving());
            auth.set_availability(availability);
            let gate = BiometricGate::new(auth.clone());

            let err = gate.authenticate(&pending_transaction(1).await).await.unwrap_err();
            assert_eq!(err, expected);
            assert_eq!(auth.prompts(), 0);
        }
    }
}
