// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the loaded [`SignerConfig`].
//! Configuration is read once at startup; command-line flags override it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WC_RPC_URL` | EVM JSON-RPC endpoint used for submission | Avalanche Fuji RPC |
//! | `WC_PRIVATE_KEY` | Hex private key of the active account | Required unless `WC_PRIVATE_KEY_PEM` is set |
//! | `WC_PRIVATE_KEY_PEM` | Path to a PEM private key (SEC1 or PKCS#8) | Optional |
//! | `WC_GAS_LIMIT` | Fixed gas limit for every transaction | Estimate × 1.3 |
//! | `WC_GAS_TIP_WEI` | Priority fee in wei | `1500000000` (1.5 gwei) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fmt;
use std::path::PathBuf;

use crate::blockchain::{Account, ChainError, GasSettings, NetworkConfig};

/// EVM JSON-RPC endpoint. Unset means Avalanche Fuji.
pub const RPC_URL_ENV: &str = "WC_RPC_URL";

/// Hex private key of the active account. Takes precedence over the PEM path.
pub const PRIVATE_KEY_ENV: &str = "WC_PRIVATE_KEY";

/// Path to a PEM-encoded private key.
pub const PRIVATE_KEY_PEM_ENV: &str = "WC_PRIVATE_KEY_PEM";

/// Fixed gas limit. When set, gas is never estimated.
pub const GAS_LIMIT_ENV: &str = "WC_GAS_LIMIT";

/// Priority fee (tip) in wei.
pub const GAS_TIP_WEI_ENV: &str = "WC_GAS_TIP_WEI";

/// Environment variable name for the logging format.
///
/// Set to `json` for structured logs, anything else for human-readable
/// output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Where the active account's key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Hex(String),
    PemFile(PathBuf),
}

impl KeySource {
    pub fn load(&self) -> Result<Account, ChainError> {
        match self {
            Self::Hex(hex) => Account::from_hex(hex),
            Self::PemFile(path) => Account::from_pem_file(path),
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(_) => f.write_str("Hex(<redacted>)"),
            Self::PemFile(path) => f.debug_tuple("PemFile").field(path).finish(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Everything the `connect` command needs besides the pairing URI.
#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub network: NetworkConfig,
    pub key: KeySource,
    pub gas: GasSettings,
}

impl SignerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` for variable values. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let network = get(RPC_URL_ENV)
            .map(NetworkConfig::custom)
            .unwrap_or_default();

        let key = match (get(PRIVATE_KEY_ENV), get(PRIVATE_KEY_PEM_ENV)) {
            (Some(hex), _) => KeySource::Hex(hex),
            (None, Some(path)) => KeySource::PemFile(PathBuf::from(path)),
            (None, None) => return Err(ConfigError::MissingKey),
        };

        let mut gas = GasSettings::default();
        if let Some(raw) = get(GAS_LIMIT_ENV) {
            gas.gas_limit = Some(parse_number(GAS_LIMIT_ENV, &raw)?);
        }
        if let Some(raw) = get(GAS_TIP_WEI_ENV) {
            gas.priority_fee_wei = parse_number(GAS_TIP_WEI_ENV, &raw)?;
        }

        Ok(Self { network, key, gas })
    }

    /// Override the RPC endpoint (from `--rpc-url`).
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.network = NetworkConfig::custom(rpc_url);
        self
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No signing key: set {PRIVATE_KEY_ENV} or {PRIVATE_KEY_PEM_ENV}")]
    MissingKey,

    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{DEFAULT_PRIORITY_FEE_WEI, FUJI_RPC_URL};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SignerConfig::from_lookup(lookup(&[(PRIVATE_KEY_ENV, "0xabc")])).unwrap();
        assert_eq!(config.network.rpc_url, FUJI_RPC_URL);
        assert_eq!(config.key, KeySource::Hex("0xabc".into()));
        assert_eq!(config.gas.gas_limit, None);
        assert_eq!(config.gas.priority_fee_wei, DEFAULT_PRIORITY_FEE_WEI);
    }

    #[test]
    fn test_all_variables() {
        let config = SignerConfig::from_lookup(lookup(&[
            (RPC_URL_ENV, "http://127.0.0.1:8545"),
            (PRIVATE_KEY_PEM_ENV, "/keys/signer.pem"),
            (GAS_LIMIT_ENV, "90000"),
            (GAS_TIP_WEI_ENV, "2000000000"),
        ]))
        .unwrap();

        assert_eq!(config.network.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.network.explorer_url, None);
        assert_eq!(config.key, KeySource::PemFile(PathBuf::from("/keys/signer.pem")));
        assert_eq!(config.gas.gas_limit, Some(90_000));
        assert_eq!(config.gas.priority_fee_wei, 2_000_000_000);
    }

    #[test]
    fn test_hex_key_wins_and_empty_is_unset() {
        let config = SignerConfig::from_lookup(lookup(&[
            (PRIVATE_KEY_ENV, "11"),
            (PRIVATE_KEY_PEM_ENV, "/keys/signer.pem"),
            (RPC_URL_ENV, "  "),
        ]))
        .unwrap();
        assert_eq!(config.key, KeySource::Hex("11".into()));
        assert_eq!(config.network.rpc_url, FUJI_RPC_URL);

        let missing = SignerConfig::from_lookup(lookup(&[(PRIVATE_KEY_ENV, "")]));
        assert!(matches!(missing, Err(ConfigError::MissingKey)));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = SignerConfig::from_lookup(lookup(&[
            (PRIVATE_KEY_ENV, "11"),
            (GAS_LIMIT_ENV, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: GAS_LIMIT_ENV, .. }));
    }

    #[test]
    fn test_rpc_url_override() {
        let config = SignerConfig::from_lookup(lookup(&[(PRIVATE_KEY_ENV, "11")]))
            .unwrap()
            .with_rpc_url("https://rpc.example.org");
        assert_eq!(config.network.rpc_url, "https://rpc.example.org");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
    }

    #[test]
    fn test_key_source_debug_redacts_hex() {
        let rendered = format!("{:?}", KeySource::Hex("deadbeef".into()));
        assert!(!rendered.contains("deadbeef"));
    }
}
