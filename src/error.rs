// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::send::{AuthenticationError, BuildError, EstimationError, Phase, SourceError, SubmissionError};

/// Every recoverable failure the send flow can surface to its listener.
///
/// Input errors are not part of this type: they only ever show up inline as
/// a field's `ValidationState`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendFlowError {
    #[error(transparent)]
    Estimation(#[from] EstimationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(SourceError),

    /// Address or amount changed after the send was confirmed.
    #[error("Inputs changed before the transaction was sent")]
    InputChanged,

    #[error("A send is already in progress")]
    SubmissionInFlight,

    #[error("Action not allowed while {0}")]
    InvalidPhase(Phase),

    #[error("Send flow has shut down")]
    Closed,
}

impl SendFlowError {
    /// Stable snake_case code for telemetry and UI mapping.
    pub fn error_code(&self) -> &'static str {
        match self {
            SendFlowError::Estimation(e) => e.error_code(),
            SendFlowError::Build(e) => e.error_code(),
            SendFlowError::Authentication(e) => e.error_code(),
            SendFlowError::Submission(e) => e.error_code(),
            SendFlowError::BalanceUnavailable(_) => "balance_unavailable",
            SendFlowError::InputChanged => "input_changed",
            SendFlowError::SubmissionInFlight => "submission_in_flight",
            SendFlowError::InvalidPhase(_) => "invalid_phase",
            SendFlowError::Closed => "closed",
        }
    }

    /// Short human-readable message for a notice.
    pub fn user_message(&self) -> &'static str {
        match self {
            SendFlowError::Estimation(e) => e.user_message(),
            SendFlowError::Build(e) => e.user_message(),
            SendFlowError::Authentication(e) => e.user_message(),
            SendFlowError::Submission(e) => e.user_message(),
            SendFlowError::BalanceUnavailable(_) => "cannot load balance, check network",
            SendFlowError::InputChanged => "details changed, review and confirm again",
            SendFlowError::SubmissionInFlight => "a send is already in progress",
            SendFlowError::InvalidPhase(_) => "this action is not available right now",
            SendFlowError::Closed => "send is no longer available",
        }
    }

    /// Whether the same action can be attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendFlowError::Submission(e) => e.is_retryable(),
            SendFlowError::Estimation(_)
            | SendFlowError::Authentication(_)
            | SendFlowError::BalanceUnavailable(_) => true,
            SendFlowError::Build(BuildError::BalanceUnavailable(_))
            | SendFlowError::Build(BuildError::NonceUnavailable(_)) => true,
            _ => false,
        }
    }
}
