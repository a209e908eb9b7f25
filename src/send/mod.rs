// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Send transaction pipeline.
//!
//! Turns a raw recipient address and amount into a signed, broadcast native
//! AVAX transfer:
//!
//! - `validation` - inline address and amount checks
//! - `gas` - three-tier fee estimation
//! - `builder` - balance check, nonce assignment, `PendingTransaction`
//! - `gate` - biometric confirmation bound to one transaction
//! - `submitter` - broadcast and hash parsing
//! - `fiat` - debounced fiat conversion of the typed amount
//! - `flow` - the orchestrator, with `actor` serializing UI events onto it

pub mod actor;
pub mod builder;
pub mod fiat;
pub mod flow;
pub mod gas;
pub mod gate;
pub mod sources;
pub mod state;
pub mod submitter;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use actor::SendFlowHandle;
pub use builder::{BuildError, PendingTransaction, TransactionBuilder};
pub use fiat::{FiatConverter, FiatQuote, DEFAULT_FIAT_DEBOUNCE};
pub use flow::{Collaborators, FlowSettings, RetryAuthPolicy, SendFlow};
pub use gas::{EstimationError, FeeSpeed, GasFeeEstimator, GasFeeTier, GasOptions};
pub use gate::{AuthGrant, AuthenticationError, BiometricGate};
pub use sources::{
    AccountSource, BalanceSource, BiometricAuthenticator, BiometryAvailability,
    NetworkBroadcaster, PriceSource, SourceError,
};
pub use state::{
    Phase, PreparationSummary, SendFlowListener, SendFlowMessage, SendFlowSnapshot, SendResult,
};
pub use submitter::{SubmissionError, SubmissionReceipt, TransactionHash, TransactionSubmitter};
pub use validation::{AddressValidator, AmountValidator, ValidationState};

pub use crate::error::SendFlowError;
