// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for Avalanche C-Chain.
//!
//! This module provides the chain-backed collaborators of the send flow:
//! - Native AVAX balance, base fee and nonce queries (`AvaxClient`)
//! - Signing and broadcasting of prepared transfers (`RpcBroadcaster`)
//! - Wallet key loading from PEM

pub mod client;
pub mod signing;
pub mod transactions;
pub mod types;

pub use client::{AvaxClient, AvaxClientError};
pub use transactions::{format_amount, parse_amount, RpcBroadcaster};
pub use types::*;
