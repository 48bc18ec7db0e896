// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Wallet - WalletConnect Signer
//!
//! Lets a dApp request session approval, transaction submission and
//! message signatures from the command-line wallet over the WalletConnect v1
//! bridge, without ever seeing the private key.
//!
//! ## Modules
//!
//! - `walletconnect` - Pairing URI, envelope codec, relay, session, dispatcher
//! - `blockchain` - Account, personal-sign and EVM transaction submission
//! - `confirm` - Interactive confirmation prompt
//! - `config` - Environment configuration
//! - `logging` - Tracing subscriber setup

pub mod blockchain;
pub mod config;
pub mod confirm;
pub mod error;
pub mod logging;
pub mod walletconnect;

pub use error::WalletConnectError;
