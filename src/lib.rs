// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Send Flow - Native AVAX Send Pipeline
//!
//! Drives a wallet send from raw field input to a broadcast transaction:
//! inline validation, tiered fee estimation, transaction building, a
//! biometric gate and broadcast, with retry that never rebuilds.
//!
//! ## Modules
//!
//! - `send` - the pipeline and its orchestrator
//! - `blockchain` - Avalanche C-Chain collaborators
//! - `config` - environment configuration and logging setup
//! - `error` - flow-level error type

pub mod blockchain;
pub mod config;
pub mod error;
pub mod send;
