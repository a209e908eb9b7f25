// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::builder::{PendingTransaction, TransactionBuilder};
use super::flow::{Collaborators, FlowSettings, SendFlow};
use super::gas::{FeeSpeed, GasFeeEstimator};
use super::sources::{
    AccountSource, BalanceSource, BiometricAuthenticator, BiometryAvailability,
    NetworkBroadcaster, PriceSource, SourceError,
};
use super::state::{SendFlowListener, SendFlowMessage};
use super::submitter::SubmissionError;

pub const VALID_ADDRESS: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12";

pub const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

pub struct FakeBalance {
    balance: Mutex<Decimal>,
    failing: AtomicBool,
}

impl FakeBalance {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: Mutex::new(balance),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set(&self, balance: Decimal) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BalanceSource for FakeBalance {
    async fn current_balance(&self) -> Result<Decimal, SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("balance offline".into()));
        }
        Ok(*self.balance.lock().unwrap())
    }
}

pub struct FakePrices {
    base_fee: Decimal,
    fiat: Decimal,
    base_fee_failing: AtomicBool,
    fiat_failing: AtomicBool,
    base_fee_calls: AtomicUsize,
    fiat_calls: AtomicUsize,
    fiat_delay: Mutex<Duration>,
}

impl FakePrices {
    pub fn new(base_fee: Decimal, fiat: Decimal) -> Self {
        Self {
            base_fee,
            fiat,
            base_fee_failing: AtomicBool::new(false),
            fiat_failing: AtomicBool::new(false),
            base_fee_calls: AtomicUsize::new(0),
            fiat_calls: AtomicUsize::new(0),
            fiat_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn fail_base_fee(&self, failing: bool) {
        self.base_fee_failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_fiat(&self, failing: bool) {
        self.fiat_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_fiat_delay(&self, delay: Duration) {
        *self.fiat_delay.lock().unwrap() = delay;
    }

    pub fn base_fee_calls(&self) -> usize {
        self.base_fee_calls.load(Ordering::SeqCst)
    }

    pub fn fiat_calls(&self) -> usize {
        self.fiat_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn current_base_fee_price(&self) -> Result<Decimal, SourceError> {
        self.base_fee_calls.fetch_add(1, Ordering::SeqCst);
        if self.base_fee_failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("rpc timeout".into()));
        }
        Ok(self.base_fee)
    }

    async fn native_token_price_in_fiat(&self) -> Result<Decimal, SourceError> {
        self.fiat_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fiat_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fiat_failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("price oracle offline".into()));
        }
        Ok(self.fiat)
    }
}

pub struct FakeAccount {
    next: AtomicU64,
    issued: AtomicUsize,
    failing: AtomicBool,
}

impl FakeAccount {
    pub fn starting_at(nonce: u64) -> Self {
        Self {
            next: AtomicU64::new(nonce),
            issued: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of nonces handed out.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountSource for FakeAccount {
    async fn next_nonce(&self) -> Result<u64, SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("nonce offline".into()));
        }
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Approves unless an answer was queued with [`FakeAuthenticator::push_answer`].
pub struct FakeAuthenticator {
    default_answer: bool,
    answers: Mutex<VecDeque<bool>>,
    availability: Mutex<BiometryAvailability>,
    delay: Mutex<Duration>,
    prompts: AtomicUsize,
}

impl FakeAuthenticator {
    fn with_default(default_answer: bool) -> Self {
        Self {
            default_answer,
            answers: Mutex::new(VecDeque::new()),
            availability: Mutex::new(BiometryAvailability::Available),
            delay: Mutex::new(Duration::ZERO),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn approving() -> Self {
        Self::with_default(true)
    }

    pub fn declining() -> Self {
        Self::with_default(false)
    }

    pub fn push_answer(&self, answer: bool) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn set_availability(&self, availability: BiometryAvailability) {
        *self.availability.lock().unwrap() = availability;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricAuthenticator for FakeAuthenticator {
    async fn availability(&self) -> BiometryAvailability {
        *self.availability.lock().unwrap()
    }

    async fn authenticate(&self, _reason: &str) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let queued = self.answers.lock().unwrap().pop_front();
        queued.unwrap_or(self.default_answer)
    }
}

/// Returns [`TX_HASH`] unless a result was queued.
pub struct FakeBroadcaster {
    results: Mutex<VecDeque<Result<String, SubmissionError>>>,
    broadcasts: Mutex<Vec<PendingTransaction>>,
}

impl FakeBroadcaster {
    pub fn succeeding() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_result(&self, result: Result<String, SubmissionError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn broadcasts(&self) -> Vec<PendingTransaction> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkBroadcaster for FakeBroadcaster {
    async fn broadcast(&self, transaction: &PendingTransaction) -> Result<String, SubmissionError> {
        self.broadcasts.lock().unwrap().push(transaction.clone());
        let queued = self.results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(TX_HASH.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingListener {
    messages: Mutex<Vec<SendFlowMessage>>,
}

impl RecordingListener {
    pub fn messages(&self) -> Vec<SendFlowMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl SendFlowListener for RecordingListener {
    fn reconcile(&self, message: SendFlowMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

/// A normal-tier transaction for 1.5 AVAX with the given nonce.
pub async fn pending_transaction(nonce: u64) -> PendingTransaction {
    let prices = Arc::new(FakePrices::new(dec!(25), dec!(30)));
    let options = GasFeeEstimator::new(prices)
        .estimate(VALID_ADDRESS, "1.5")
        .await
        .unwrap();
    TransactionBuilder::new(
        Arc::new(FakeBalance::new(dec!(10))),
        Arc::new(FakeAccount::starting_at(nonce)),
    )
    .build(VALID_ADDRESS, "1.5", options.tier(FeeSpeed::Normal))
    .await
    .unwrap()
}

/// Fakes for every collaborator of a flow, kept for inspection.
pub struct Harness {
    pub balances: Arc<FakeBalance>,
    pub prices: Arc<FakePrices>,
    pub accounts: Arc<FakeAccount>,
    pub authenticator: Arc<FakeAuthenticator>,
    pub broadcaster: Arc<FakeBroadcaster>,
}

impl Harness {
    /// 25 gwei base fee, 30 fiat per AVAX, nonces from 0.
    pub fn new(balance: Decimal) -> Self {
        Self {
            balances: Arc::new(FakeBalance::new(balance)),
            prices: Arc::new(FakePrices::new(dec!(25), dec!(30))),
            accounts: Arc::new(FakeAccount::starting_at(0)),
            authenticator: Arc::new(FakeAuthenticator::approving()),
            broadcaster: Arc::new(FakeBroadcaster::succeeding()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            balances: self.balances.clone(),
            prices: self.prices.clone(),
            accounts: self.accounts.clone(),
            authenticator: self.authenticator.clone(),
            broadcaster: self.broadcaster.clone(),
        }
    }

    pub fn flow(&self) -> SendFlow {
        self.flow_with(FlowSettings::default())
    }

    pub fn flow_with(&self, settings: FlowSettings) -> SendFlow {
        SendFlow::new(self.collaborators(), settings)
    }
}
