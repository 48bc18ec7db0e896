// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::blockchain::ChainError;
use crate::config::ConfigError;
use crate::walletconnect::{RelayError, UriError};

/// Errors that end the `connect` command.
///
/// Per-message problems never get here: the session logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum WalletConnectError {
    #[error("Invalid pairing URI: {0}")]
    Uri(#[from] UriError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Account error: {0}")]
    Chain(#[from] ChainError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
}
