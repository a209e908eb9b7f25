// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pure input validators for the recipient address and the send amount.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

/// Required address prefix.
pub const ADDRESS_PREFIX: &str = "0x";

/// Number of hex characters after the prefix (20 bytes).
pub const ADDRESS_HEX_LEN: usize = 40;

/// Fractional digits of the native token (AVAX has 18).
pub const NATIVE_DECIMALS: u8 = 18;

pub const MSG_ENTER_ADDRESS: &str = "enter an address";
pub const MSG_INVALID_ADDRESS: &str = "enter a valid address";
pub const MSG_ENTER_AMOUNT: &str = "enter an amount";
pub const MSG_INVALID_AMOUNT: &str = "enter a valid amount";
pub const MSG_INSUFFICIENT_BALANCE: &str = "insufficient balance";

/// Validation status of a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ValidationState {
    #[default]
    NotEvaluated,
    Valid,
    Invalid(String),
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationState::Valid)
    }

    /// Inline message for the field, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationState::Invalid(message) => Some(message),
            _ => None,
        }
    }

    fn invalid(message: &str) -> Self {
        ValidationState::Invalid(message.to_string())
    }
}

/// Syntactic recipient address check: `0x` followed by 40 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressValidator;

impl AddressValidator {
    pub fn validate(raw: &str) -> ValidationState {
        let address = raw.trim();
        if address.is_empty() {
            return ValidationState::invalid(MSG_ENTER_ADDRESS);
        }
        if is_well_formed_address(address) {
            ValidationState::Valid
        } else {
            ValidationState::invalid(MSG_INVALID_ADDRESS)
        }
    }
}

/// Check an already trimmed address against the prefix + hex body format.
pub fn is_well_formed_address(address: &str) -> bool {
    match address.strip_prefix(ADDRESS_PREFIX) {
        Some(body) => {
            body.len() == ADDRESS_HEX_LEN && body.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Outcome of an amount check.
///
/// `parsed` is populated whenever the input was a well-formed positive
/// decimal, including when it exceeds the balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountValidation {
    pub state: ValidationState,
    pub parsed: Option<Decimal>,
}

/// Decimal amount check against a balance snapshot supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountValidator;

impl AmountValidator {
    pub fn validate(raw: &str, balance: Decimal) -> AmountValidation {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return AmountValidation {
                state: ValidationState::invalid(MSG_ENTER_AMOUNT),
                parsed: None,
            };
        }

        let Some(amount) = parse_positive_amount(trimmed) else {
            return AmountValidation {
                state: ValidationState::invalid(MSG_INVALID_AMOUNT),
                parsed: None,
            };
        };

        let state = if amount > balance {
            ValidationState::invalid(MSG_INSUFFICIENT_BALANCE)
        } else {
            ValidationState::Valid
        };

        AmountValidation {
            state,
            parsed: Some(amount),
        }
    }
}

/// Parse a strictly positive decimal with at most [`NATIVE_DECIMALS`]
/// fractional digits.
pub fn parse_positive_amount(raw: &str) -> Option<Decimal> {
    let amount = Decimal::from_str(raw.trim()).ok()?;
    if amount <= Decimal::ZERO || amount.normalize().scale() > u32::from(NATIVE_DECIMALS) {
        return None;
    }
    Some(amount)
}
