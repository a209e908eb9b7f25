// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by the send flow binary. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SEND_FLOW_NETWORK` | `fuji` or `mainnet` | `fuji` |
//! | `SEND_FLOW_RPC_URL` | RPC endpoint override | network's public endpoint |
//! | `FIAT_DEBOUNCE_MS` | Quiet period before a fiat lookup | `300` |
//! | `MAX_SUBMIT_ATTEMPTS` | Broadcast failures tolerated per transaction | `3` |
//! | `RETRY_AUTH_POLICY` | `reauthenticate` or `reuse_grant` | `reauthenticate` |
//! | `NATIVE_FIAT_RATE` | Fiat value of one AVAX | Required by the binary |
//! | `WALLET_KEY_PEM` | Path to the sending account's PEM key | Required by the binary |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::blockchain::{network_by_name, NetworkConfig};
use crate::send::{FlowSettings, RetryAuthPolicy, DEFAULT_FIAT_DEBOUNCE};

pub const NETWORK_ENV: &str = "SEND_FLOW_NETWORK";
pub const RPC_URL_ENV: &str = "SEND_FLOW_RPC_URL";
pub const FIAT_DEBOUNCE_MS_ENV: &str = "FIAT_DEBOUNCE_MS";
pub const MAX_SUBMIT_ATTEMPTS_ENV: &str = "MAX_SUBMIT_ATTEMPTS";
pub const RETRY_AUTH_POLICY_ENV: &str = "RETRY_AUTH_POLICY";
pub const NATIVE_FIAT_RATE_ENV: &str = "NATIVE_FIAT_RATE";
pub const WALLET_KEY_PEM_ENV: &str = "WALLET_KEY_PEM";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const DEFAULT_MAX_SUBMIT_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value `{value}` for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} is not set")]
    Missing(&'static str),
}

/// Everything the binary needs to run one send flow.
#[derive(Debug, Clone)]
pub struct SendFlowConfig {
    pub network: NetworkConfig,
    pub rpc_url: String,
    pub fiat_debounce: Duration,
    pub max_submit_attempts: u32,
    pub retry_auth_policy: RetryAuthPolicy,
    pub native_fiat_rate: Option<Decimal>,
    pub wallet_key_pem: Option<PathBuf>,
}

impl SendFlowConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let network_raw = get(NETWORK_ENV);
        let network = network_by_name(network_raw.as_deref()).map_err(|reason| {
            ConfigError::Invalid {
                name: NETWORK_ENV,
                value: network_raw.clone().unwrap_or_default(),
                reason,
            }
        })?;

        let rpc_url = get(RPC_URL_ENV).unwrap_or_else(|| network.rpc_url.to_string());

        let fiat_debounce = match get(FIAT_DEBOUNCE_MS_ENV) {
            Some(raw) => Duration::from_millis(parse_var(FIAT_DEBOUNCE_MS_ENV, &raw)?),
            None => DEFAULT_FIAT_DEBOUNCE,
        };

        let max_submit_attempts = match get(MAX_SUBMIT_ATTEMPTS_ENV) {
            Some(raw) => {
                let attempts: u32 = parse_var(MAX_SUBMIT_ATTEMPTS_ENV, &raw)?;
                if attempts == 0 {
                    return Err(ConfigError::Invalid {
                        name: MAX_SUBMIT_ATTEMPTS_ENV,
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                attempts
            }
            None => DEFAULT_MAX_SUBMIT_ATTEMPTS,
        };

        let retry_auth_policy = match get(RETRY_AUTH_POLICY_ENV) {
            Some(raw) => parse_var(RETRY_AUTH_POLICY_ENV, &raw)?,
            None => RetryAuthPolicy::default(),
        };

        let native_fiat_rate = match get(NATIVE_FIAT_RATE_ENV) {
            Some(raw) => {
                let rate: Decimal = parse_var(NATIVE_FIAT_RATE_ENV, &raw)?;
                if rate.is_sign_negative() {
                    return Err(ConfigError::Invalid {
                        name: NATIVE_FIAT_RATE_ENV,
                        value: raw,
                        reason: "must not be negative".to_string(),
                    });
                }
                Some(rate)
            }
            None => None,
        };

        Ok(Self {
            network,
            rpc_url,
            fiat_debounce,
            max_submit_attempts,
            retry_auth_policy,
            native_fiat_rate,
            wallet_key_pem: get(WALLET_KEY_PEM_ENV).map(PathBuf::from),
        })
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            fiat_debounce: self.fiat_debounce,
            max_submit_attempts: self.max_submit_attempts,
            retry_auth_policy: self.retry_auth_policy,
            explorer_url: self.network.explorer_url.to_string(),
        }
    }

    pub fn require_wallet_key(&self) -> Result<&PathBuf, ConfigError> {
        self.wallet_key_pem
            .as_ref()
            .ok_or(ConfigError::Missing(WALLET_KEY_PEM_ENV))
    }

    /// Fee tiers carry a fiat value, so estimation needs a rate.
    pub fn require_fiat_rate(&self) -> Result<Decimal, ConfigError> {
        self.native_fiat_rate
            .ok_or(ConfigError::Missing(NATIVE_FIAT_RATE_ENV))
    }
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Anything other than `json` falls back to `Pretty`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. Call once, early in `main()`.
pub fn init_tracing() {
    let format = std::env::var(LOG_FORMAT_ENV)
        .map(|v| LogFormat::from_str_lossy(&v))
        .unwrap_or(LogFormat::Pretty);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{AVAX_FUJI, AVAX_MAINNET};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<SendFlowConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SendFlowConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_target_fuji() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.network, AVAX_FUJI);
        assert_eq!(config.rpc_url, AVAX_FUJI.rpc_url);
        assert_eq!(config.fiat_debounce, Duration::from_millis(300));
        assert_eq!(config.max_submit_attempts, 3);
        assert_eq!(config.retry_auth_policy, RetryAuthPolicy::Reauthenticate);
        assert_eq!(config.native_fiat_rate, None);
        assert_eq!(
            config.require_fiat_rate(),
            Err(ConfigError::Missing(NATIVE_FIAT_RATE_ENV))
        );
        assert_eq!(
            config.require_wallet_key(),
            Err(ConfigError::Missing(WALLET_KEY_PEM_ENV))
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            (NETWORK_ENV, "mainnet"),
            (RPC_URL_ENV, "http://localhost:9650/ext/bc/C/rpc"),
            (FIAT_DEBOUNCE_MS_ENV, "150"),
            (MAX_SUBMIT_ATTEMPTS_ENV, "5"),
            (RETRY_AUTH_POLICY_ENV, "reuse_grant"),
            (NATIVE_FIAT_RATE_ENV, "31.25"),
            (WALLET_KEY_PEM_ENV, "/keys/wallet.pem"),
        ])
        .unwrap();

        assert_eq!(config.network, AVAX_MAINNET);
        assert_eq!(config.rpc_url, "http://localhost:9650/ext/bc/C/rpc");
        assert_eq!(config.native_fiat_rate, Some(dec!(31.25)));
        assert_eq!(config.require_wallet_key().unwrap(), &PathBuf::from("/keys/wallet.pem"));

        let settings = config.flow_settings();
        assert_eq!(settings.fiat_debounce, Duration::from_millis(150));
        assert_eq!(settings.max_submit_attempts, 5);
        assert_eq!(settings.retry_auth_policy, RetryAuthPolicy::ReuseGrant);
        assert_eq!(settings.explorer_url, "https://snowtrace.io");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config_from(&[(NETWORK_ENV, "sepolia")]),
            Err(ConfigError::Invalid { name: NETWORK_ENV, .. })
        ));
        assert!(matches!(
            config_from(&[(MAX_SUBMIT_ATTEMPTS_ENV, "0")]),
            Err(ConfigError::Invalid { name: MAX_SUBMIT_ATTEMPTS_ENV, .. })
        ));
        assert!(matches!(
            config_from(&[(FIAT_DEBOUNCE_MS_ENV, "soon")]),
            Err(ConfigError::Invalid { name: FIAT_DEBOUNCE_MS_ENV, .. })
        ));
        assert!(matches!(
            config_from(&[(NATIVE_FIAT_RATE_ENV, "-1")]),
            Err(ConfigError::Invalid { name: NATIVE_FIAT_RATE_ENV, .. })
        ));
        assert!(matches!(
            config_from(&[(RETRY_AUTH_POLICY_ENV, "never")]),
            Err(ConfigError::Invalid { name: RETRY_AUTH_POLICY_ENV, .. })
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(NETWORK_ENV, "  "), (NATIVE_FIAT_RATE_ENV, "")]).unwrap();
        assert_eq!(config.network, AVAX_FUJI);
        assert_eq!(config.native_fiat_rate, None);
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("xml"), LogFormat::Pretty);
    }
}
