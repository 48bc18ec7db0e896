// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain submission contract used by the dispatcher.
//!
//! The WalletConnect layer only needs one thing from a chain: "send this
//! transaction from this account and give me the hash". Any client that
//! satisfies [`ChainSubmitter`] will do; [`super::AlloySubmitter`] is the
//! production one.

use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use super::signing::Account;
use super::types::TxRequest;

/// Submits transactions on behalf of the active account.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Sign and broadcast `tx` with `sender` as `from`. Blocks until the node
    /// accepts or rejects it; no timeout is applied here.
    async fn submit(&self, sender: &Account, tx: TxRequest) -> Result<B256, ChainError>;
}

/// Parse a `0x`-prefixed address.
pub fn parse_address(raw: &str) -> Result<Address, ChainError> {
    Address::from_str(raw.trim()).map_err(|e| ChainError::InvalidAddress(format!("{raw}: {e}")))
}

/// Parse a hex quantity (`0x1bc16d674ec80000`). Empty strings and a bare
/// `0x` are zero.
pub fn parse_quantity(raw: &str) -> Result<U256, ChainError> {
    let digits = raw.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidQuantity(format!("{raw}: {e}")))
}

/// Parse hex call data. Empty strings and a bare `0x` are empty data.
pub fn parse_data(raw: &str) -> Result<Bytes, ChainError> {
    let digits = raw.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    alloy::hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| ChainError::InvalidData(e.to_string()))
}

/// Format wei (or token units) to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid call data: {0}")]
    InvalidData(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}
