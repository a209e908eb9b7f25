// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tiered network fee estimation.
//!
//! Three deterministic multiples of the current base fee are offered to the
//! user. Prices are quoted in gwei per gas and rounded to wei precision so a
//! tier can be placed on the wire without further conversion.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::sources::{PriceSource, SourceError};
use super::validation::{is_well_formed_address, parse_positive_amount};

/// Gas consumed by a plain native-token transfer.
pub const SIMPLE_TRANSFER_GAS_LIMIT: u64 = 21_000;

/// 1 native token = 1e9 gwei.
const GWEI_PER_NATIVE: u64 = 1_000_000_000;

/// Gwei prices carry at most 9 fractional digits (1 wei).
const GWEI_DECIMALS: u32 = 9;

/// Fiat amounts are shown with cent precision.
pub const FIAT_DECIMALS: u32 = 2;

const MSG_CANNOT_ESTIMATE: &str = "cannot estimate fee, check network";

/// Confirmation speed of a fee tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeSpeed {
    Slow,
    Normal,
    Fast,
}

impl FeeSpeed {
    pub const ALL: [FeeSpeed; 3] = [FeeSpeed::Slow, FeeSpeed::Normal, FeeSpeed::Fast];

    /// Multiple of the base fee charged by this tier.
    pub fn multiplier(self) -> Decimal {
        match self {
            FeeSpeed::Slow => Decimal::new(8, 1),
            FeeSpeed::Normal => Decimal::ONE,
            FeeSpeed::Fast => Decimal::new(14, 1),
        }
    }

    pub fn estimated_time(self) -> Duration {
        match self {
            FeeSpeed::Slow => Duration::from_secs(180),
            FeeSpeed::Normal => Duration::from_secs(60),
            FeeSpeed::Fast => Duration::from_secs(15),
        }
    }
}

impl std::fmt::Display for FeeSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeeSpeed::Slow => "slow",
            FeeSpeed::Normal => "normal",
            FeeSpeed::Fast => "fast",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for FeeSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(FeeSpeed::Slow),
            "normal" => Ok(FeeSpeed::Normal),
            "fast" => Ok(FeeSpeed::Fast),
            other => Err(format!("Unknown fee speed `{other}`")),
        }
    }
}

/// One selectable fee option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasFeeTier {
    pub speed: FeeSpeed,
    /// Max fee per gas, in gwei
    pub fee_price_gwei: Decimal,
    pub estimated_time: Duration,
    /// Total fee for the gas limit, in native token
    pub fee_native: Decimal,
    /// Total fee converted to fiat
    pub fee_fiat: Decimal,
}

/// The three fee tiers computed together for one (address, amount) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasOptions {
    pub slow: GasFeeTier,
    pub normal: GasFeeTier,
    pub fast: GasFeeTier,
    pub gas_limit: u64,
}

impl GasOptions {
    pub fn tier(&self, speed: FeeSpeed) -> &GasFeeTier {
        match speed {
            FeeSpeed::Slow => &self.slow,
            FeeSpeed::Normal => &self.normal,
            FeeSpeed::Fast => &self.fast,
        }
    }

    pub fn tiers(&self) -> [&GasFeeTier; 3] {
        [&self.slow, &self.normal, &self.fast]
    }

    /// Fee ascends and confirmation time descends from slow to fast.
    pub fn is_ordered(&self) -> bool {
        self.slow.fee_native <= self.normal.fee_native
            && self.normal.fee_native <= self.fast.fee_native
            && self.slow.estimated_time >= self.normal.estimated_time
            && self.normal.estimated_time >= self.fast.estimated_time
    }
}

/// Fee estimation failure. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimationError {
    #[error("Cannot estimate fee for an invalid address")]
    InvalidAddress,

    #[error("Cannot estimate fee for an invalid amount")]
    InvalidAmount,

    #[error("Price source failed: {0}")]
    PriceUnavailable(#[from] SourceError),

    #[error("Base fee out of range: {0}")]
    PriceOutOfRange(String),
}

impl EstimationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EstimationError::InvalidAddress => "estimation_invalid_address",
            EstimationError::InvalidAmount => "estimation_invalid_amount",
            EstimationError::PriceUnavailable(_) => "estimation_price_unavailable",
            EstimationError::PriceOutOfRange(_) => "estimation_price_out_of_range",
        }
    }

    pub fn user_message(&self) -> &'static str {
        MSG_CANNOT_ESTIMATE
    }
}

/// Computes slow/normal/fast tiers from the price oracle.
pub struct GasFeeEstimator {
    prices: Arc<dyn PriceSource>,
    gas_limit: u64,
}

impl GasFeeEstimator {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self {
            prices,
            gas_limit: SIMPLE_TRANSFER_GAS_LIMIT,
        }
    }

    /// Estimate fee tiers for sending `amount` to `address`.
    ///
    /// Inputs are re-checked here independently of the field validators.
    pub async fn estimate(&self, address: &str, amount: &str) -> Result<GasOptions, EstimationError> {
        if !is_well_formed_address(address.trim()) {
            return Err(EstimationError::InvalidAddress);
        }
        if parse_positive_amount(amount).is_none() {
            return Err(EstimationError::InvalidAmount);
        }

        let base_price = self.prices.current_base_fee_price().await?;
        let fiat_price = self.prices.native_token_price_in_fiat().await?;

        let options = compute_options(base_price, fiat_price, self.gas_limit)?;

        tracing::debug!(
            base_price_gwei = %base_price,
            slow = %options.slow.fee_native,
            normal = %options.normal.fee_native,
            fast = %options.fast.fee_native,
            "Estimated fee tiers"
        );

        Ok(options)
    }
}

fn compute_options(
    base_price_gwei: Decimal,
    fiat_price: Decimal,
    gas_limit: u64,
) -> Result<GasOptions, EstimationError> {
    if base_price_gwei.is_sign_negative() && !base_price_gwei.is_zero() {
        return Err(EstimationError::PriceOutOfRange(format!(
            "negative base fee {base_price_gwei}"
        )));
    }
    if fiat_price.is_sign_negative() && !fiat_price.is_zero() {
        return Err(EstimationError::PriceOutOfRange(format!(
            "negative fiat price {fiat_price}"
        )));
    }

    let slow_price = tier_price(base_price_gwei, FeeSpeed::Slow)?;
    // Clamp keeps the ordering even if a multiplier is ever tuned below its neighbour.
    let normal_price = tier_price(base_price_gwei, FeeSpeed::Normal)?.max(slow_price);
    let fast_price = tier_price(base_price_gwei, FeeSpeed::Fast)?.max(normal_price);

    Ok(GasOptions {
        slow: build_tier(FeeSpeed::Slow, slow_price, fiat_price, gas_limit)?,
        normal: build_tier(FeeSpeed::Normal, normal_price, fiat_price, gas_limit)?,
        fast: build_tier(FeeSpeed::Fast, fast_price, fiat_price, gas_limit)?,
        gas_limit,
    })
}

fn tier_price(base_price_gwei: Decimal, speed: FeeSpeed) -> Result<Decimal, EstimationError> {
    base_price_gwei
        .checked_mul(speed.multiplier())
        .map(|price| price.round_dp_with_strategy(GWEI_DECIMALS, RoundingStrategy::ToPositiveInfinity))
        .ok_or_else(|| EstimationError::PriceOutOfRange(base_price_gwei.to_string()))
}

fn build_tier(
    speed: FeeSpeed,
    fee_price_gwei: Decimal,
    fiat_price: Decimal,
    gas_limit: u64,
) -> Result<GasFeeTier, EstimationError> {
    let fee_native = fee_in_native(fee_price_gwei, gas_limit)
        .ok_or_else(|| EstimationError::PriceOutOfRange(fee_price_gwei.to_string()))?;
    let fee_fiat = fee_native
        .checked_mul(fiat_price)
        .map(to_fiat)
        .ok_or_else(|| EstimationError::PriceOutOfRange(fiat_price.to_string()))?;

    Ok(GasFeeTier {
        speed,
        fee_price_gwei,
        estimated_time: speed.estimated_time(),
        fee_native,
        fee_fiat,
    })
}

/// Total fee in native token for `gas_limit` gas at `price_gwei` per gas.
pub fn fee_in_native(price_gwei: Decimal, gas_limit: u64) -> Option<Decimal> {
    price_gwei
        .checked_mul(Decimal::from(gas_limit))?
        .checked_div(Decimal::from(GWEI_PER_NATIVE))
}

/// Round a fiat value to display precision.
pub fn to_fiat(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(FIAT_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}
