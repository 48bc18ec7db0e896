// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC messages carried inside envelopes, and the typed method set.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_SESSION_REQUEST: &str = "wc_sessionRequest";
pub const METHOD_SEND_TRANSACTION: &str = "eth_sendTransaction";
pub const METHOD_PERSONAL_SIGN: &str = "personal_sign";

/// Decrypted request from the dApp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: i64,
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

/// Response sent back to the dApp. Only success results exist: failures are
/// never reported on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub id: i64,
    pub jsonrpc: String,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn new(id: i64, result: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
        }
    }
}

/// dApp metadata sent with the session request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// First parameter of `wc_sessionRequest`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequestParams {
    pub peer_id: String,
    #[serde(default)]
    pub peer_meta: Option<PeerMeta>,
    /// Echoed back verbatim in the approval.
    #[serde(default)]
    pub chain_id: Value,
}

/// First parameter of `eth_sendTransaction`. Fields stay as strings; the
/// dispatcher validates them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionParams {
    /// Ignored: the active account is always the sender.
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
}

/// Decoded request, one variant per supported method.
#[derive(Debug, Clone, PartialEq)]
pub enum WcRequest {
    SessionRequest(SessionRequestParams),
    SendTransaction(TransactionParams),
    /// Hex message exactly as received (with its `0x` prefix).
    PersonalSign(String),
    Unsupported(String),
}

impl WcRequest {
    /// Decode the params of `request` with the schema of its method.
    pub fn decode(request: &JsonRpcRequest) -> Result<Self, ParamsError> {
        let params = &request.params;
        Ok(match request.method.as_str() {
            METHOD_SESSION_REQUEST => Self::SessionRequest(first_param(params)?),
            METHOD_SEND_TRANSACTION => Self::SendTransaction(first_param(params)?),
            METHOD_PERSONAL_SIGN => Self::PersonalSign(first_param(params)?),
            other => Self::Unsupported(other.to_string()),
        })
    }

    pub fn method(&self) -> &str {
        match self {
            Self::SessionRequest(_) => METHOD_SESSION_REQUEST,
            Self::SendTransaction(_) => METHOD_SEND_TRANSACTION,
            Self::PersonalSign(_) => METHOD_PERSONAL_SIGN,
            Self::Unsupported(method) => method,
        }
    }
}

fn first_param<T: DeserializeOwned>(params: &Value) -> Result<T, ParamsError> {
    let first = params
        .as_array()
        .and_then(|p| p.first())
        .ok_or(ParamsError::Missing)?;
    T::deserialize(first).map_err(ParamsError::Invalid)
}

/// Request params that do not match the method's schema.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("params must be a non-empty array")]
    Missing,

    #[error("invalid params: {0}")]
    Invalid(#[source] serde_json::Error),
}
