// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Command-line driver: `relational-send-flow <recipient> <amount> [slow|normal|fast]`.

mod console;

use std::process::ExitCode;
use std::sync::Arc;

use relational_send_flow::blockchain::signing::{load_signer, wallet_from_signer};
use relational_send_flow::blockchain::{AvaxClient, RpcBroadcaster};
use relational_send_flow::config::{init_tracing, SendFlowConfig};
use relational_send_flow::send::{
    Collaborators, FeeSpeed, Phase, SendFlow, SendFlowHandle, SendResult,
};
use tokio_util::sync::CancellationToken;

use console::{confirm, ConsoleAuthenticator, LogListener};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct SendArgs {
    recipient: String,
    amount: String,
    speed: FeeSpeed,
}

fn parse_args() -> Result<SendArgs, BoxError> {
    let mut args = std::env::args().skip(1);
    let usage = "usage: relational-send-flow <recipient> <amount> [slow|normal|fast]";
    let recipient = args.next().ok_or(usage)?;
    let amount = args.next().ok_or(usage)?;
    let speed = match args.next() {
        Some(raw) => raw.parse::<FeeSpeed>()?,
        None => FeeSpeed::Normal,
    };
    Ok(SendArgs {
        recipient,
        amount,
        speed,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling send");
                shutdown.cancel();
            }
        }
    });

    let outcome = tokio::select! {
        outcome = run(shutdown.clone()) => outcome,
        _ = shutdown.cancelled() => Ok(false),
    };
    shutdown.cancel();

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Send aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the transaction was broadcast.
async fn run(shutdown: CancellationToken) -> Result<bool, BoxError> {
    let args = parse_args()?;
    let config = SendFlowConfig::from_env()?;

    let signer = load_signer(config.require_wallet_key()?)?;
    let account = signer.address().to_string();
    tracing::info!(
        network = config.network.name,
        account = %account,
        rpc_url = %config.rpc_url,
        "Loaded wallet"
    );

    let client = Arc::new(
        AvaxClient::new(config.network.clone(), &config.rpc_url, &account)?
            .with_fiat_rate(Some(config.require_fiat_rate()?)),
    );
    let broadcaster = Arc::new(RpcBroadcaster::new(
        config.network.clone(),
        &config.rpc_url,
        wallet_from_signer(signer),
    )?);

    let flow = SendFlow::new(
        Collaborators {
            balances: client.clone(),
            prices: client.clone(),
            accounts: client,
            authenticator: Arc::new(ConsoleAuthenticator),
            broadcaster,
        },
        config.flow_settings(),
    );
    let listener = Arc::new(LogListener);
    flow.set_listener(&listener);

    let (handle, _task) = SendFlowHandle::spawn(flow, shutdown);

    handle.change_address(args.recipient)?;
    handle.change_amount(args.amount)?;
    let snapshot = handle.snapshot().await?;

    if snapshot.phase != Phase::AwaitingFeeSelection {
        for message in [snapshot.address.message(), snapshot.amount.message()]
            .into_iter()
            .flatten()
        {
            println!("{message}");
        }
        if let Some(notice) = snapshot.notice {
            println!("{}", notice.user_message());
        }
        return Ok(false);
    }

    if let Some(options) = &snapshot.gas_options {
        for tier in options.tiers() {
            println!(
                "{:>6}: {} AVAX (~{}) at {} gwei, ~{}s",
                tier.speed,
                tier.fee_native.normalize(),
                tier.fee_fiat,
                tier.fee_price_gwei.normalize(),
                tier.estimated_time.as_secs()
            );
        }
    }

    handle.select_fee(args.speed).await?;
    if let Some(summary) = handle.snapshot().await?.summary {
        println!(
            "Sending {} AVAX + {} fee = {} AVAX{}",
            summary.amount.normalize(),
            summary.fee_native.normalize(),
            summary.total_native.normalize(),
            summary
                .total_fiat
                .map(|fiat| format!(" (~{fiat})"))
                .unwrap_or_default()
        );
    }

    let mut result = handle.confirm_send().await?;
    loop {
        match result {
            SendResult::Success {
                tx_hash,
                explorer_url,
                ..
            } => {
                println!("Sent {tx_hash}");
                println!("{explorer_url}");
                return Ok(true);
            }
            SendResult::Failure {
                message, retryable, ..
            } => {
                println!("{message}");
                if !retryable || !confirm("Retry?".to_string()).await {
                    return Ok(false);
                }
            }
        }

        match handle.retry().await? {
            Some(next) => result = next,
            None => return Ok(false),
        }
    }
}
