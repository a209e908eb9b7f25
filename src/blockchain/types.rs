// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

/// Avalanche network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Avalanche C-Chain Mainnet configuration.
pub const AVAX_MAINNET: NetworkConfig = NetworkConfig {
    name: "Avalanche C-Chain",
    chain_id: 43114,
    rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    explorer_url: "https://snowtrace.io",
};

/// Avalanche Fuji Testnet configuration.
pub const AVAX_FUJI: NetworkConfig = NetworkConfig {
    name: "Avalanche Fuji Testnet",
    chain_id: 43113,
    rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
    explorer_url: "https://testnet.snowtrace.io",
};

pub const NETWORK_FUJI: &str = "fuji";
pub const NETWORK_MAINNET: &str = "mainnet";

/// Resolve a network identifier, defaulting to Fuji when unset.
pub fn network_by_name(raw: Option<&str>) -> Result<NetworkConfig, String> {
    let value = raw.unwrap_or(NETWORK_FUJI).trim().to_ascii_lowercase();
    match value.as_str() {
        NETWORK_FUJI => Ok(AVAX_FUJI),
        NETWORK_MAINNET => Ok(AVAX_MAINNET),
        _ => Err(format!(
            "Unknown network `{value}`, expected `{NETWORK_FUJI}` or `{NETWORK_MAINNET}`"
        )),
    }
}
