// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain collaborators for the WalletConnect signer.
//!
//! This module provides:
//! - The active account and Ethereum personal-sign signatures
//! - The chain submission contract and its alloy implementation

pub mod client;
pub mod signing;
pub mod transactions;
pub mod types;

pub use client::{ChainError, ChainSubmitter};
pub use signing::Account;
pub use transactions::AlloySubmitter;
pub use types::*;
