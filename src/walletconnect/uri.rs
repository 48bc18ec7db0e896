// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pairing URI parsing.
//!
//! Format: `wc:<topic>@<version>?bridge=<url>&key=<hex>`

use std::str::FromStr;

use url::Url;

use super::envelope::{EnvelopeError, SharedKey};

/// Only the v1 bridge protocol is spoken by this signer.
pub const SUPPORTED_VERSION: &str = "1";

const SCHEME: &str = "wc";

/// A parsed `wc:` connection string.
#[derive(Debug, Clone)]
pub struct PairingUri {
    topic: String,
    version: String,
    bridge: Url,
    key: SharedKey,
}

impl PairingUri {
    /// Parse and validate a pairing URI.
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        let parsed = Url::parse(raw.trim()).map_err(|e| UriError::Malformed(e.to_string()))?;
        if parsed.scheme() != SCHEME {
            return Err(UriError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        // `wc:` URIs have no authority, so topic@version sits in the path.
        let (topic, version) = parsed
            .path()
            .split_once('@')
            .ok_or(UriError::MissingField("version"))?;
        if topic.is_empty() {
            return Err(UriError::MissingField("topic"));
        }
        if version != SUPPORTED_VERSION {
            return Err(UriError::UnsupportedVersion(version.to_string()));
        }

        let mut bridge = None;
        let mut key = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "bridge" => bridge = Some(value.into_owned()),
                "key" => key = Some(value.into_owned()),
                _ => {}
            }
        }

        let bridge = bridge
            .filter(|b| !b.is_empty())
            .ok_or(UriError::MissingField("bridge"))?;
        let bridge = Url::parse(&bridge).map_err(|e| UriError::InvalidBridge(e.to_string()))?;

        let key = key
            .filter(|k| !k.is_empty())
            .ok_or(UriError::MissingField("key"))?;
        let key = SharedKey::from_hex(&key)?;

        Ok(Self {
            topic: topic.to_string(),
            version: version.to_string(),
            bridge,
            key,
        })
    }

    /// Pairing topic chosen by the dApp.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Bridge URL as given in the URI (usually `https://...`).
    pub fn bridge(&self) -> &Url {
        &self.bridge
    }

    pub fn key(&self) -> &SharedKey {
        &self.key
    }

    /// WebSocket endpoint of the bridge: `http` becomes `ws`, `https`
    /// becomes `wss`. Already-WebSocket URLs are returned unchanged.
    pub fn relay_url(&self) -> Result<Url, UriError> {
        let scheme = match self.bridge.scheme() {
            "http" => "ws",
            "https" => "wss",
            "ws" | "wss" => return Ok(self.bridge.clone()),
            other => return Err(UriError::InvalidBridge(format!("unsupported scheme `{other}`"))),
        };

        let mut url = self.bridge.clone();
        url.set_scheme(scheme)
            .map_err(|_| UriError::InvalidBridge(format!("cannot switch {url} to `{scheme}`")))?;
        Ok(url)
    }
}

impl FromStr for PairingUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors that make a pairing URI unusable. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum UriError {
    #[error("Malformed pairing URI: {0}")]
    Malformed(String),

    #[error("Unsupported URI scheme `{0}` (expected `wc`)")]
    UnsupportedScheme(String),

    #[error("Unsupported WalletConnect version `{0}` (only v1 is supported)")]
    UnsupportedVersion(String),

    #[error("Pairing URI is missing `{0}`")]
    MissingField(&'static str),

    #[error("Invalid bridge URL: {0}")]
    InvalidBridge(String),

    #[error("Invalid pairing key: {0}")]
    InvalidKey(#[from] EnvelopeError),
}
