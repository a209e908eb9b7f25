// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Terminal stand-ins for the platform pieces of a send.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use relational_send_flow::send::{
    BiometricAuthenticator, BiometryAvailability, SendFlowListener, SendFlowMessage,
};

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub async fn confirm(prompt: String) -> bool {
    let answer = tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{prompt} [y/N] ");
        let _ = stdout.flush();
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await;

    match answer {
        Ok(Ok(line)) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}

/// Explicit typed confirmation in place of a biometric match.
pub struct ConsoleAuthenticator;

#[async_trait]
impl BiometricAuthenticator for ConsoleAuthenticator {
    async fn availability(&self) -> BiometryAvailability {
        BiometryAvailability::Available
    }

    async fn authenticate(&self, reason: &str) -> bool {
        confirm(format!("{reason}?")).await
    }
}

/// Mirrors flow updates into the log.
pub struct LogListener;

impl SendFlowListener for LogListener {
    fn reconcile(&self, message: SendFlowMessage) {
        match message {
            SendFlowMessage::PhaseChanged(phase) => tracing::debug!(%phase, "Phase"),
            SendFlowMessage::FiatUpdated(Some(quote)) => {
                tracing::info!(amount = %quote.amount, fiat = %quote.fiat, "Fiat value")
            }
            SendFlowMessage::Notice(error) => {
                tracing::warn!(code = error.error_code(), "{}", error.user_message())
            }
            other => tracing::trace!(?other, "Flow update"),
        }
    }
}
