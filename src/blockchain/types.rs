// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::{Address, Bytes, U256};

/// EVM network the signer submits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Block explorer URL, used for log links
    pub explorer_url: Option<String>,
}

/// Avalanche Fuji Testnet, the default when no RPC URL is configured.
pub const FUJI_NAME: &str = "Avalanche Fuji Testnet";
pub const FUJI_RPC_URL: &str = "https://api.avax-test.network/ext/bc/C/rpc";
pub const FUJI_EXPLORER_URL: &str = "https://testnet.snowtrace.io";

impl NetworkConfig {
    pub fn fuji() -> Self {
        Self {
            name: FUJI_NAME.to_string(),
            rpc_url: FUJI_RPC_URL.to_string(),
            explorer_url: Some(FUJI_EXPLORER_URL.to_string()),
        }
    }

    /// A network known only by its RPC endpoint.
    pub fn custom(rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        Self {
            name: rpc_url.clone(),
            rpc_url,
            explorer_url: None,
        }
    }

    /// Explorer link for a transaction hash, if an explorer is known.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::fuji()
    }
}

/// Transaction requested by the dApp, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    /// Call data; empty for plain transfers
    pub data: Bytes,
    /// Amount in wei
    pub value: U256,
    /// Gas limit requested by the dApp, if any
    pub gas: Option<u64>,
}

/// Gas settings for submitted transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSettings {
    /// Fixed gas limit; estimated when `None`
    pub gas_limit: Option<u64>,
    /// Priority fee (tip) in wei
    pub priority_fee_wei: u128,
}

/// 1.5 gwei tip.
pub const DEFAULT_PRIORITY_FEE_WEI: u128 = 1_500_000_000;

/// Estimated gas is scaled by 13/10 before submission.
pub const GAS_ESTIMATE_NUMERATOR: u64 = 13;
pub const GAS_ESTIMATE_DENOMINATOR: u64 = 10;

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            gas_limit: None,
            priority_fee_wei: DEFAULT_PRIORITY_FEE_WEI,
        }
    }
}
