// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Actor wrapper that confines a [`SendFlow`] to one task.
//!
//! UI events arrive through a cloneable [`SendFlowHandle`] and are applied
//! strictly in arrival order. Two guards are enforced at enqueue time:
//!
//! - an address or amount edit bumps the input epoch immediately, so a
//!   confirm that is already authenticating will refuse to broadcast;
//! - only one confirm or retry may be outstanding.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::flow::{FlowGuards, SendFlow};
use super::gas::FeeSpeed;
use super::state::{SendFlowSnapshot, SendResult};
use crate::error::SendFlowError;

enum Command {
    ChangeAddress(String),
    ChangeAmount(String),
    SelectFee(FeeSpeed, oneshot::Sender<Result<(), SendFlowError>>),
    ConfirmSend(u64, oneshot::Sender<Result<SendResult, SendFlowError>>),
    Retry(u64, oneshot::Sender<Result<Option<SendResult>, SendFlowError>>),
    DismissNotice,
    Snapshot(oneshot::Sender<SendFlowSnapshot>),
}

/// Cloneable front door to a running send flow.
#[derive(Clone)]
pub struct SendFlowHandle {
    commands: mpsc::UnboundedSender<Command>,
    guards: Arc<FlowGuards>,
}

impl SendFlowHandle {
    /// Move `flow` onto its own task. The task ends when `shutdown` fires or
    /// every handle is dropped.
    pub fn spawn(flow: SendFlow, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let guards = flow.guards();
        let task = tokio::spawn(run(flow, receiver, shutdown));
        (Self { commands, guards }, task)
    }

    pub fn change_address(&self, raw: impl Into<String>) -> Result<(), SendFlowError> {
        self.guards.bump_epoch();
        self.send(Command::ChangeAddress(raw.into()))
    }

    pub fn change_amount(&self, raw: impl Into<String>) -> Result<(), SendFlowError> {
        self.guards.bump_epoch();
        self.send(Command::ChangeAmount(raw.into()))
    }

    pub fn dismiss_notice(&self) -> Result<(), SendFlowError> {
        self.send(Command::DismissNotice)
    }

    pub async fn select_fee(&self, speed: FeeSpeed) -> Result<(), SendFlowError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::SelectFee(speed, reply))?;
        response.await.map_err(|_| SendFlowError::Closed)?
    }

    pub async fn confirm_send(&self) -> Result<SendResult, SendFlowError> {
        if !self.guards.try_begin_confirm() {
            return Err(SendFlowError::SubmissionInFlight);
        }
        let (reply, response) = oneshot::channel();
        if let Err(e) = self.send(Command::ConfirmSend(self.guards.epoch(), reply)) {
            self.guards.finish_confirm();
            return Err(e);
        }
        response.await.map_err(|_| SendFlowError::Closed)?
    }

    pub async fn retry(&self) -> Result<Option<SendResult>, SendFlowError> {
        if !self.guards.try_begin_confirm() {
            return Err(SendFlowError::SubmissionInFlight);
        }
        let (reply, response) = oneshot::channel();
        if let Err(e) = self.send(Command::Retry(self.guards.epoch(), reply)) {
            self.guards.finish_confirm();
            return Err(e);
        }
        response.await.map_err(|_| SendFlowError::Closed)?
    }

    pub async fn snapshot(&self) -> Result<SendFlowSnapshot, SendFlowError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        response.await.map_err(|_| SendFlowError::Closed)
    }

    fn send(&self, command: Command) -> Result<(), SendFlowError> {
        self.commands.send(command).map_err(|_| SendFlowError::Closed)
    }
}

async fn run(
    mut flow: SendFlow,
    mut commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
) {
    let flow_id = flow.flow_id();
    let guards = flow.guards();
    tracing::info!(flow_id = %flow_id, "Send flow started");

    loop {
        let command = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            Command::ChangeAddress(raw) => {
                if let Err(e) = flow.set_address(&raw).await {
                    tracing::debug!(flow_id = %flow_id, error = %e, "Address edit ignored");
                }
            }
            Command::ChangeAmount(raw) => {
                if let Err(e) = flow.set_amount(&raw).await {
                    tracing::debug!(flow_id = %flow_id, error = %e, "Amount edit ignored");
                }
            }
            Command::SelectFee(speed, reply) => {
                let _ = reply.send(flow.select_fee(speed).await);
            }
            Command::ConfirmSend(epoch, reply) => {
                let result = flow.confirm_send_at(epoch).await;
                guards.finish_confirm();
                let _ = reply.send(result);
            }
            Command::Retry(epoch, reply) => {
                let result = flow.retry_at(epoch).await;
                guards.finish_confirm();
                let _ = reply.send(result);
            }
            Command::DismissNotice => flow.dismiss_notice(),
            Command::Snapshot(reply) => {
                let _ = reply.send(flow.snapshot());
            }
        }
    }

    // Queued confirms are dropped unanswered; release their guard so later
    // calls report `Closed`.
    commands.close();
    guards.finish_confirm();

    tracing::info!(flow_id = %flow_id, phase = %flow.phase(), "Send flow stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send::state::Phase;
    use crate::send::testing::{Harness, VALID_ADDRESS};
    use crate::send::SendFlowError;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn ready_handle(harness: &Harness) -> (SendFlowHandle, CancellationToken) {
        let shutdown = CancellationToken::new();
        let (handle, _task) = SendFlowHandle::spawn(harness.flow(), shutdown.clone());
        handle.change_address(VALID_ADDRESS).unwrap();
        handle.change_amount("1.5").unwrap();
        handle.select_fee(FeeSpeed::Normal).await.unwrap();
        (handle, shutdown)
    }

    #[tokio::test]
    async fn events_apply_in_order() {
        let harness = Harness::new(dec!(2.0));
        let (handle, _shutdown) = ready_handle(&harness).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::ReadyToSend);
        assert!(handle.confirm_send().await.unwrap().is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_during_authentication_blocks_broadcast() {
        let harness = Harness::new(dec!(2.0));
        harness.authenticator.set_delay(Duration::from_secs(2));
        let (handle, _shutdown) = ready_handle(&harness).await;

        let confirming = tokio::spawn({
            let handle = handle.clone();
            async move { handle.confirm_send().await }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.change_amount("1.0").unwrap();

        let result = confirming.await.unwrap().unwrap();
        assert!(matches!(result, SendResult::Failure { .. }));
        assert!(harness.broadcaster.broadcasts().is_empty());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::AwaitingFeeSelection);
        assert_eq!(snapshot.parsed_amount, Some(dec!(1.0)));
        assert!(snapshot.summary.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_confirm_is_rejected_while_one_is_outstanding() {
        let harness = Harness::new(dec!(2.0));
        harness.authenticator.set_delay(Duration::from_secs(1));
        let (handle, _shutdown) = ready_handle(&harness).await;

        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.confirm_send().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            handle.confirm_send().await,
            Err(SendFlowError::SubmissionInFlight)
        );
        assert!(first.await.unwrap().unwrap().is_success());
        assert_eq!(harness.broadcaster.broadcasts().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_the_handle() {
        let harness = Harness::new(dec!(2.0));
        let shutdown = CancellationToken::new();
        let (handle, task) = SendFlowHandle::spawn(harness.flow(), shutdown.clone());

        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(handle.change_address(VALID_ADDRESS), Err(SendFlowError::Closed));
        assert!(matches!(handle.snapshot().await, Err(SendFlowError::Closed)));
    }

    #[tokio::test]
    async fn shutdown_with_queued_confirm_reports_closed() {
        let harness = Harness::new(dec!(2.0));
        let shutdown = CancellationToken::new();
        let (handle, task) = SendFlowHandle::spawn(harness.flow(), shutdown.clone());
        handle.change_address(VALID_ADDRESS).unwrap();
        handle.change_amount("1.5").unwrap();
        handle.select_fee(FeeSpeed::Normal).await.unwrap();

        let confirming = tokio::spawn({
            let handle = handle.clone();
            async move { handle.confirm_send().await }
        });
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(confirming.await.unwrap(), Err(SendFlowError::Closed));
        assert_eq!(handle.confirm_send().await, Err(SendFlowError::Closed));
        assert!(matches!(handle.retry().await, Err(SendFlowError::Closed)));
        assert!(harness.broadcaster.broadcasts().is_empty());
    }
}
