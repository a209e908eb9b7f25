// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Debounced fiat conversion of the amount being typed.
//!
//! Every new amount cancels the previous conversion task through its
//! `CancellationToken` before a new one is scheduled. A task publishes its
//! result only while holding the slot lock and only if its token is still
//! live; cancellation takes the same lock, so a superseded task can never
//! write after its replacement was scheduled.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::gas::to_fiat;
use super::sources::PriceSource;

/// Default quiet period before a conversion runs.
pub const DEFAULT_FIAT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Fiat equivalent of an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiatQuote {
    pub amount: Decimal,
    pub fiat: Decimal,
}

/// Receives every published (or cleared) quote.
pub type FiatCallback = Arc<dyn Fn(Option<FiatQuote>) + Send + Sync>;

#[derive(Default)]
struct Slot {
    in_flight: Option<CancellationToken>,
    latest: Option<FiatQuote>,
}

/// Converts the most recent amount to fiat after a quiet period.
pub struct FiatConverter {
    prices: Arc<dyn PriceSource>,
    debounce: Duration,
    slot: Arc<Mutex<Slot>>,
    on_update: Option<FiatCallback>,
}

impl FiatConverter {
    pub fn new(prices: Arc<dyn PriceSource>, debounce: Duration) -> Self {
        Self {
            prices,
            debounce,
            slot: Arc::new(Mutex::new(Slot::default())),
            on_update: None,
        }
    }

    /// Register the callback invoked when a quote is published or cleared.
    ///
    /// The callback runs while the slot lock is held and must not call back
    /// into the converter.
    pub fn with_callback(mut self, on_update: FiatCallback) -> Self {
        self.on_update = Some(on_update);
        self
    }

    /// Cancel any pending conversion and schedule one for `amount`.
    pub fn schedule(&self, amount: Decimal) {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(previous) = slot.in_flight.replace(token.clone()) {
                previous.cancel();
            }
        }

        let prices = self.prices.clone();
        let slot = self.slot.clone();
        let on_update = self.on_update.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let price = tokio::select! {
                _ = token.cancelled() => return,
                price = prices.native_token_price_in_fiat() => price,
            };
            let quote = price
                .ok()
                .and_then(|p| amount.checked_mul(p))
                .map(|fiat| FiatQuote {
                    amount,
                    fiat: to_fiat(fiat),
                });
            if quote.is_none() {
                tracing::warn!(amount = %amount, "Fiat conversion unavailable");
            }

            let Ok(mut slot) = slot.lock() else {
                return;
            };
            if token.is_cancelled() {
                return;
            }
            slot.in_flight = None;
            // A failed lookup clears the quote of the previous amount.
            if quote.is_none() && slot.latest.is_none() {
                return;
            }
            slot.latest = quote.clone();
            if let Some(on_update) = on_update {
                on_update(quote);
            }
        });
    }

    /// Cancel any pending conversion and forget the last quote.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(previous) = slot.in_flight.take() {
                previous.cancel();
            }
            if slot.latest.take().is_some() {
                if let Some(on_update) = &self.on_update {
                    on_update(None);
                }
            }
        }
    }

    /// Most recently published quote.
    pub fn latest(&self) -> Option<FiatQuote> {
        self.slot.lock().ok().and_then(|slot| slot.latest.clone())
    }
}

impl Drop for FiatConverter {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(token) = slot.in_flight.take() {
                token.cancel();
            }
        }
    }
}
