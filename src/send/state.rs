// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outward-facing state of a send flow.

use rust_decimal::Decimal;
use serde::Serialize;

use super::fiat::FiatQuote;
use super::gas::GasOptions;
use super::submitter::TransactionHash;
use super::validation::ValidationState;
use crate::error::SendFlowError;

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// At least one field is not valid yet
    Validating,
    /// Both fields valid but no fee options (estimation failed)
    AwaitingBothValid,
    Estimating,
    AwaitingFeeSelection,
    Preparing,
    ReadyToSend,
    Authenticating,
    Submitting,
    Succeeded,
    /// Submit attempts exhausted
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::AwaitingBothValid => "awaiting_both_valid",
            Phase::Estimating => "estimating",
            Phase::AwaitingFeeSelection => "awaiting_fee_selection",
            Phase::Preparing => "preparing",
            Phase::ReadyToSend => "ready_to_send",
            Phase::Authenticating => "authenticating",
            Phase::Submitting => "submitting",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Totals shown on the confirmation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparationSummary {
    pub amount: Decimal,
    pub fee_native: Decimal,
    pub total_native: Decimal,
    /// Missing when the fiat price could not be fetched
    pub total_fiat: Option<Decimal>,
}

/// Outcome of a confirm or retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SendResult {
    Success {
        tx_hash: TransactionHash,
        explorer_url: String,
        submitted_at: chrono::DateTime<chrono::Utc>,
    },
    Failure {
        message: String,
        error_code: String,
        retryable: bool,
    },
}

impl SendResult {
    pub(crate) fn failure(error: &SendFlowError) -> Self {
        SendResult::Failure {
            message: error.user_message().to_string(),
            error_code: error.error_code().to_string(),
            retryable: error.is_retryable(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SendResult::Success { .. })
    }
}

/// Point-in-time copy of everything the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendFlowSnapshot {
    pub phase: Phase,
    pub address: ValidationState,
    pub amount: ValidationState,
    pub parsed_amount: Option<Decimal>,
    pub gas_options: Option<GasOptions>,
    pub summary: Option<PreparationSummary>,
    pub fiat: Option<FiatQuote>,
    pub notice: Option<SendFlowError>,
    pub result: Option<SendResult>,
}

/// Update pushed to the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFlowMessage {
    PhaseChanged(Phase),
    AddressValidated(ValidationState),
    AmountValidated(ValidationState),
    GasOptionsUpdated(Option<GasOptions>),
    Prepared(Option<PreparationSummary>),
    FiatUpdated(Option<FiatQuote>),
    /// One-shot dismissible error notice
    Notice(SendFlowError),
    Result(SendResult),
}

/// Observer for flow updates. The flow holds it weakly and never manages
/// its lifetime.
pub trait SendFlowListener: Send + Sync {
    fn reconcile(&self, message: SendFlowMessage);
}
