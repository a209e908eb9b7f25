// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Send Flow Orchestrator
//!
//! Stateful coordinator that drives one send from raw field input to a
//! broadcast transaction.
//!
//! ## Phases
//!
//! ```text
//! Idle -> Validating -> Estimating -> AwaitingFeeSelection -> Preparing
//!      -> ReadyToSend -> Authenticating -> Submitting -> Succeeded
//!                                                     \-> Failed
//! ```
//!
//! - Any address or amount edit discards fee options and the prepared
//!   transaction, then re-validates and (when both fields are valid)
//!   re-estimates.
//! - A failed estimation parks the flow in `AwaitingBothValid`.
//! - Gate and broadcast failures return to `ReadyToSend` with the prepared
//!   transaction untouched; `retry` re-runs the captured last action on it.
//!
//! Every method takes `&mut self`, so at most one transition is ever in
//! flight. Concurrent UI events are serialized by [`super::SendFlowHandle`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use super::builder::{PendingTransaction, TransactionBuilder};
use super::fiat::{FiatConverter, DEFAULT_FIAT_DEBOUNCE};
use super::gas::{to_fiat, FeeSpeed, GasFeeEstimator, GasOptions};
use super::gate::{AuthGrant, BiometricGate};
use super::sources::{
    AccountSource, BalanceSource, BiometricAuthenticator, NetworkBroadcaster, PriceSource,
};
use super::state::{
    Phase, PreparationSummary, SendFlowListener, SendFlowMessage, SendFlowSnapshot, SendResult,
};
use super::submitter::{SubmissionError, TransactionSubmitter};
use super::validation::{parse_positive_amount, AddressValidator, AmountValidator, ValidationState};
use crate::error::SendFlowError;

/// External collaborators of one flow.
#[derive(Clone)]
pub struct Collaborators {
    pub balances: Arc<dyn BalanceSource>,
    pub prices: Arc<dyn PriceSource>,
    pub accounts: Arc<dyn AccountSource>,
    pub authenticator: Arc<dyn BiometricAuthenticator>,
    pub broadcaster: Arc<dyn NetworkBroadcaster>,
}

/// Whether a broadcast retry must pass the biometric gate again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryAuthPolicy {
    /// Every broadcast attempt needs a fresh approval.
    #[default]
    Reauthenticate,
    /// A failed broadcast keeps its approval for the identical transaction.
    ReuseGrant,
}

impl std::str::FromStr for RetryAuthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reauthenticate" => Ok(RetryAuthPolicy::Reauthenticate),
            "reuse_grant" => Ok(RetryAuthPolicy::ReuseGrant),
            other => Err(format!("Unknown retry auth policy `{other}`")),
        }
    }
}

/// Tunables of one flow.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub fiat_debounce: Duration,
    /// Broadcast failures tolerated for one prepared transaction
    pub max_submit_attempts: u32,
    pub retry_auth_policy: RetryAuthPolicy,
    /// Block explorer base URL used for result links
    pub explorer_url: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            fiat_debounce: DEFAULT_FIAT_DEBOUNCE,
            max_submit_attempts: 3,
            retry_auth_policy: RetryAuthPolicy::default(),
            explorer_url: crate::blockchain::AVAX_FUJI.explorer_url.to_string(),
        }
    }
}

/// Cross-task guards shared between a flow and its handle.
#[derive(Debug, Default)]
pub(crate) struct FlowGuards {
    input_epoch: AtomicU64,
    confirm_in_flight: AtomicBool,
}

impl FlowGuards {
    pub(crate) fn epoch(&self) -> u64 {
        self.input_epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_epoch(&self) {
        self.input_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns `false` if a confirm or retry is already outstanding.
    pub(crate) fn try_begin_confirm(&self) -> bool {
        self.confirm_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn finish_confirm(&self) {
        self.confirm_in_flight.store(false, Ordering::SeqCst);
    }
}

type ListenerSlot = Arc<RwLock<Option<Weak<dyn SendFlowListener>>>>;

fn notify(slot: &ListenerSlot, message: SendFlowMessage) {
    let listener = slot
        .read()
        .ok()
        .and_then(|guard| guard.as_ref().and_then(Weak::upgrade));
    if let Some(listener) = listener {
        listener.reconcile(message);
    }
}

/// What `retry` re-invokes on the held transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastAction {
    Authenticate,
    Submit,
}

struct Prepared {
    transaction: PendingTransaction,
    summary: PreparationSummary,
    next: LastAction,
    grant: Option<AuthGrant>,
    failed_submits: u32,
}

/// The send pipeline orchestrator.
pub struct SendFlow {
    flow_id: Uuid,
    estimator: GasFeeEstimator,
    builder: TransactionBuilder,
    gate: BiometricGate,
    submitter: TransactionSubmitter,
    balances: Arc<dyn BalanceSource>,
    prices: Arc<dyn PriceSource>,
    fiat: FiatConverter,
    settings: FlowSettings,
    listener: ListenerSlot,
    guards: Arc<FlowGuards>,

    phase: Phase,
    address_text: String,
    amount_text: String,
    address_state: ValidationState,
    amount_state: ValidationState,
    parsed_amount: Option<rust_decimal::Decimal>,
    gas_options: Option<GasOptions>,
    prepared: Option<Prepared>,
    notice: Option<SendFlowError>,
    result: Option<SendResult>,
}

impl SendFlow {
    pub fn new(collaborators: Collaborators, settings: FlowSettings) -> Self {
        let listener: ListenerSlot = Arc::new(RwLock::new(None));
        let fiat_listener = listener.clone();
        let fiat = FiatConverter::new(collaborators.prices.clone(), settings.fiat_debounce)
            .with_callback(Arc::new(move |quote| {
                notify(&fiat_listener, SendFlowMessage::FiatUpdated(quote))
            }));

        Self {
            flow_id: Uuid::new_v4(),
            estimator: GasFeeEstimator::new(collaborators.prices.clone()),
            builder: TransactionBuilder::new(
                collaborators.balances.clone(),
                collaborators.accounts.clone(),
            ),
            gate: BiometricGate::new(collaborators.authenticator),
            submitter: TransactionSubmitter::new(collaborators.broadcaster),
            balances: collaborators.balances,
            prices: collaborators.prices,
            fiat,
            settings,
            listener,
            guards: Arc::new(FlowGuards::default()),
            phase: Phase::Idle,
            address_text: String::new(),
            amount_text: String::new(),
            address_state: ValidationState::NotEvaluated,
            amount_state: ValidationState::NotEvaluated,
            parsed_amount: None,
            gas_options: None,
            prepared: None,
            notice: None,
            result: None,
        }
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The transaction currently awaiting confirmation, if any.
    pub fn pending_transaction(&self) -> Option<&PendingTransaction> {
        self.prepared.as_ref().map(|p| &p.transaction)
    }

    pub(crate) fn guards(&self) -> Arc<FlowGuards> {
        self.guards.clone()
    }

    /// Register the listener. Only a weak reference is kept.
    pub fn set_listener<L: SendFlowListener + 'static>(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener);
        let weak: Weak<dyn SendFlowListener> = weak;
        if let Ok(mut slot) = self.listener.write() {
            *slot = Some(weak);
        }
    }

    pub fn snapshot(&self) -> SendFlowSnapshot {
        SendFlowSnapshot {
            phase: self.phase,
            address: self.address_state.clone(),
            amount: self.amount_state.clone(),
            parsed_amount: self.parsed_amount,
            gas_options: self.gas_options.clone(),
            summary: self.prepared.as_ref().map(|p| p.summary.clone()),
            fiat: self.fiat.latest(),
            notice: self.notice.clone(),
            result: self.result.clone(),
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // -------------------------------------------------------------------------
    // Field edits
    // -------------------------------------------------------------------------

    pub async fn set_address(&mut self, raw: &str) -> Result<(), SendFlowError> {
        self.ensure_editable()?;
        self.address_text = raw.to_string();
        self.address_state = AddressValidator::validate(raw);
        self.emit(SendFlowMessage::AddressValidated(self.address_state.clone()));

        self.inputs_changed().await;
        Ok(())
    }

    pub async fn set_amount(&mut self, raw: &str) -> Result<(), SendFlowError> {
        self.ensure_editable()?;
        self.amount_text = raw.to_string();

        match self.balances.current_balance().await {
            Ok(balance) => {
                let validation = AmountValidator::validate(raw, balance);
                self.amount_state = validation.state;
                self.parsed_amount = validation.parsed;
            }
            Err(e) => {
                warn!(flow_id = %self.flow_id, error = %e, "Balance lookup failed during amount validation");
                self.amount_state = ValidationState::NotEvaluated;
                self.parsed_amount = parse_positive_amount(raw);
                self.raise(SendFlowError::BalanceUnavailable(e));
            }
        }

        match self.parsed_amount {
            Some(amount) => self.fiat.schedule(amount),
            None => self.fiat.clear(),
        }
        self.emit(SendFlowMessage::AmountValidated(self.amount_state.clone()));

        self.inputs_changed().await;
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), SendFlowError> {
        if self.phase.is_terminal() {
            return Err(SendFlowError::InvalidPhase(self.phase));
        }
        Ok(())
    }

    async fn inputs_changed(&mut self) {
        if self.gas_options.take().is_some() {
            self.emit(SendFlowMessage::GasOptionsUpdated(None));
        }
        if self.prepared.take().is_some() {
            self.emit(SendFlowMessage::Prepared(None));
        }

        if self.address_state.is_valid() && self.amount_state.is_valid() {
            self.estimate().await;
        } else {
            self.set_phase(Phase::Validating);
        }
    }

    // -------------------------------------------------------------------------
    // Fee estimation and preparation
    // -------------------------------------------------------------------------

    async fn estimate(&mut self) {
        self.set_phase(Phase::Estimating);
        match self
            .estimator
            .estimate(&self.address_text, &self.amount_text)
            .await
        {
            Ok(options) => {
                self.gas_options = Some(options.clone());
                self.emit(SendFlowMessage::GasOptionsUpdated(Some(options)));
                self.set_phase(Phase::AwaitingFeeSelection);
            }
            Err(e) => {
                warn!(flow_id = %self.flow_id, error = %e, "Fee estimation failed");
                self.set_phase(Phase::AwaitingBothValid);
                self.raise(e.into());
            }
        }
    }

    /// Build the transaction for the chosen tier.
    ///
    /// Allowed while awaiting a fee choice or when a transaction is already
    /// prepared (re-selecting replaces it).
    pub async fn select_fee(&mut self, speed: FeeSpeed) -> Result<(), SendFlowError> {
        if !matches!(self.phase, Phase::AwaitingFeeSelection | Phase::ReadyToSend) {
            return Err(SendFlowError::InvalidPhase(self.phase));
        }
        let Some(tier) = self.gas_options.as_ref().map(|o| o.tier(speed).clone()) else {
            return Err(SendFlowError::InvalidPhase(self.phase));
        };
        if self.prepared.take().is_some() {
            self.emit(SendFlowMessage::Prepared(None));
        }

        self.set_phase(Phase::Preparing);
        match self
            .builder
            .build(&self.address_text, &self.amount_text, &tier)
            .await
        {
            Ok(transaction) => {
                let summary = self.summarize(&transaction).await;
                info!(
                    flow_id = %self.flow_id,
                    nonce = transaction.nonce(),
                    speed = %speed,
                    total = %summary.total_native,
                    "Transaction prepared"
                );
                self.prepared = Some(Prepared {
                    transaction,
                    summary: summary.clone(),
                    next: LastAction::Authenticate,
                    grant: None,
                    failed_submits: 0,
                });
                self.emit(SendFlowMessage::Prepared(Some(summary)));
                self.set_phase(Phase::ReadyToSend);
                Ok(())
            }
            Err(e) => {
                warn!(flow_id = %self.flow_id, error = %e, "Transaction preparation failed");
                self.set_phase(Phase::AwaitingFeeSelection);
                let error = SendFlowError::from(e);
                self.raise(error.clone());
                Err(error)
            }
        }
    }

    async fn summarize(&self, transaction: &PendingTransaction) -> PreparationSummary {
        let total_native = transaction.total_native();
        let total_fiat = match self.prices.native_token_price_in_fiat().await {
            Ok(price) => total_native.checked_mul(price).map(to_fiat),
            Err(e) => {
                warn!(flow_id = %self.flow_id, error = %e, "Fiat price unavailable for summary");
                None
            }
        };

        PreparationSummary {
            amount: transaction.amount(),
            fee_native: transaction.fee().fee_native,
            total_native,
            total_fiat,
        }
    }

    // -------------------------------------------------------------------------
    // Confirmation, authentication and broadcast
    // -------------------------------------------------------------------------

    /// Authenticate and broadcast the prepared transaction.
    pub async fn confirm_send(&mut self) -> Result<SendResult, SendFlowError> {
        let epoch = self.guards.epoch();
        self.confirm_send_at(epoch).await
    }

    /// Confirm as of input epoch `epoch`; any later edit aborts the attempt.
    pub(crate) async fn confirm_send_at(&mut self, epoch: u64) -> Result<SendResult, SendFlowError> {
        if self.phase != Phase::ReadyToSend {
            return Err(SendFlowError::InvalidPhase(self.phase));
        }
        let Some(prepared) = self.prepared.as_mut() else {
            return Err(SendFlowError::InvalidPhase(self.phase));
        };
        prepared.next = LastAction::Authenticate;
        prepared.grant = None;

        Ok(self.run_last_action(epoch).await)
    }

    /// Re-run whatever failed last: estimation, authentication or broadcast.
    ///
    /// Broadcast retries reuse the exact transaction that was prepared,
    /// never the current field values.
    pub async fn retry(&mut self) -> Result<Option<SendResult>, SendFlowError> {
        let epoch = self.guards.epoch();
        self.retry_at(epoch).await
    }

    pub(crate) async fn retry_at(&mut self, epoch: u64) -> Result<Option<SendResult>, SendFlowError> {
        match self.phase {
            Phase::AwaitingBothValid => {
                self.estimate().await;
                Ok(None)
            }
            Phase::ReadyToSend if self.prepared.is_some() => {
                Ok(Some(self.run_last_action(epoch).await))
            }
            phase => Err(SendFlowError::InvalidPhase(phase)),
        }
    }

    async fn run_last_action(&mut self, epoch: u64) -> SendResult {
        let Some(mut prepared) = self.prepared.take() else {
            return SendResult::failure(&SendFlowError::InvalidPhase(self.phase));
        };
        self.notice = None;

        if self.guards.epoch() != epoch {
            return self.attempt_failed(prepared, SendFlowError::InputChanged);
        }

        let reusable = prepared
            .grant
            .take()
            .filter(|grant| prepared.next == LastAction::Submit && grant.covers(&prepared.transaction));
        let grant = match reusable {
            Some(grant) => grant,
            None => {
                self.set_phase(Phase::Authenticating);
                match self.gate.authenticate(&prepared.transaction).await {
                    Ok(grant) => grant,
                    Err(e) => {
                        warn!(flow_id = %self.flow_id, error = %e, "Biometric gate refused");
                        prepared.next = LastAction::Authenticate;
                        return self.attempt_failed(prepared, e.into());
                    }
                }
            }
        };

        if self.guards.epoch() != epoch {
            warn!(flow_id = %self.flow_id, "Inputs edited during authentication, not broadcasting");
            prepared.next = LastAction::Authenticate;
            return self.attempt_failed(prepared, SendFlowError::InputChanged);
        }

        self.set_phase(Phase::Submitting);
        match self.submitter.submit(&prepared.transaction, &grant).await {
            Ok(receipt) => {
                let explorer_url = format!(
                    "{}/tx/{}",
                    self.settings.explorer_url.trim_end_matches('/'),
                    receipt.tx_hash
                );
                info!(
                    flow_id = %self.flow_id,
                    tx_hash = %receipt.tx_hash,
                    nonce = prepared.transaction.nonce(),
                    "Send succeeded"
                );
                let result = SendResult::Success {
                    tx_hash: receipt.tx_hash,
                    explorer_url,
                    submitted_at: receipt.submitted_at,
                };
                self.emit(SendFlowMessage::Prepared(None));
                self.set_phase(Phase::Succeeded);
                self.publish_result(result)
            }
            Err(e) => {
                prepared.failed_submits += 1;
                warn!(
                    flow_id = %self.flow_id,
                    error = %e,
                    attempt = prepared.failed_submits,
                    "Broadcast failed"
                );
                if prepared.failed_submits >= self.settings.max_submit_attempts {
                    return self.attempts_exhausted(e);
                }
                prepared.next = LastAction::Submit;
                if self.settings.retry_auth_policy == RetryAuthPolicy::ReuseGrant {
                    prepared.grant = Some(grant);
                }
                self.attempt_failed(prepared, e.into())
            }
        }
    }

    /// Back to `ReadyToSend` with the transaction kept for retry.
    fn attempt_failed(&mut self, prepared: Prepared, error: SendFlowError) -> SendResult {
        self.prepared = Some(prepared);
        self.set_phase(Phase::ReadyToSend);
        self.raise(error.clone());
        self.publish_result(SendResult::failure(&error))
    }

    fn attempts_exhausted(&mut self, error: SubmissionError) -> SendResult {
        let error = SendFlowError::from(error);
        self.emit(SendFlowMessage::Prepared(None));
        self.set_phase(Phase::Failed);
        self.raise(error.clone());
        self.publish_result(SendResult::Failure {
            message: error.user_message().to_string(),
            error_code: error.error_code().to_string(),
            retryable: false,
        })
    }

    // -------------------------------------------------------------------------
    // Outward notifications
    // -------------------------------------------------------------------------

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        tracing::debug!(flow_id = %self.flow_id, from = %self.phase, to = %phase, "Phase change");
        self.phase = phase;
        self.emit(SendFlowMessage::PhaseChanged(phase));
    }

    fn raise(&mut self, error: SendFlowError) {
        self.notice = Some(error.clone());
        self.emit(SendFlowMessage::Notice(error));
    }

    fn publish_result(&mut self, result: SendResult) -> SendResult {
        self.result = Some(result.clone());
        self.emit(SendFlowMessage::Result(result.clone()));
        result
    }

    fn emit(&self, message: SendFlowMessage) {
        notify(&self.listener, message);
    }
}
