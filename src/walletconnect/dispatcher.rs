// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maps decoded requests to signing and submission.
//!
//! Every effect is confirmed interactively first. Failures are returned to
//! the session, which logs and drops them: the dApp never receives a
//! JSON-RPC error object and simply sees no answer.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::blockchain::{
    client::{format_amount, parse_address, parse_data, parse_quantity},
    Account, ChainError, ChainSubmitter, TxRequest,
};
use crate::confirm::{ConfirmError, Confirmer};

use super::rpc::{JsonRpcResponse, SessionRequestParams, TransactionParams, WcRequest};

/// Executes requests for the active account.
pub struct Dispatcher {
    account: Account,
    chain: Arc<dyn ChainSubmitter>,
    confirmer: Arc<dyn Confirmer>,
    /// Chain id of the configured node, if it could be queried.
    chain_id: Option<u64>,
}

impl Dispatcher {
    pub fn new(account: Account, chain: Arc<dyn ChainSubmitter>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            account,
            chain,
            confirmer,
            chain_id: None,
        }
    }

    /// Remember the node's chain id so mismatching session requests are flagged.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Ask the user to approve a session and build the approval result.
    pub async fn approve_session(
        &self,
        id: i64,
        self_id: &str,
        params: &SessionRequestParams,
    ) -> Result<JsonRpcResponse, DispatchError> {
        let meta = params.peer_meta.clone().unwrap_or_default();
        let requested_chain = params.chain_id.as_u64();

        if let (Some(requested), Some(node)) = (requested_chain, self.chain_id) {
            if requested != node {
                warn!(requested, node, "dApp requested a different chain than the configured node");
            }
        }

        let mut summary = format!(
            "Session request from {} ({})",
            display_or(&meta.name, "unknown dApp"),
            display_or(&meta.url, "no url"),
        );
        if !meta.description.is_empty() {
            summary.push_str(&format!("\n{}", meta.description));
        }
        summary.push_str(&format!(
            "\nChain id: {}\nAccount:  {}",
            chain_label(&params.chain_id),
            self.account.address(),
        ));
        self.confirmer.confirm(&summary).await?;

        Ok(JsonRpcResponse::new(
            id,
            json!({
                "peerId": self_id,
                "approved": true,
                "chainId": params.chain_id,
                "accounts": [self.account.address().to_string()],
            }),
        ))
    }

    /// Execute a request on an active session. `Ok(None)` means there is no
    /// handler and nothing is sent back.
    pub async fn dispatch(
        &self,
        id: i64,
        request: WcRequest,
    ) -> Result<Option<JsonRpcResponse>, DispatchError> {
        match request {
            WcRequest::SendTransaction(params) => self.send_transaction(id, params).await.map(Some),
            WcRequest::PersonalSign(message) => self.personal_sign(id, &message).await.map(Some),
            other => {
                info!(method = other.method(), "No implementation for method");
                Ok(None)
            }
        }
    }

    async fn send_transaction(
        &self,
        id: i64,
        params: TransactionParams,
    ) -> Result<JsonRpcResponse, DispatchError> {
        let tx = transaction_request(&params)?;

        let mut summary = format!("Transaction to {}", tx.to);
        if !tx.value.is_zero() {
            summary.push_str(&format!(
                "\nValue: {} ({} wei)",
                format_amount(tx.value, 18),
                tx.value
            ));
        }
        if !tx.data.is_empty() {
            summary.push_str(&format!("\nData: {}", tx.data));
        }
        if let Some(gas) = tx.gas {
            summary.push_str(&format!("\nGas limit: {gas}"));
        }
        self.confirmer.confirm(&summary).await?;

        let hash = self.chain.submit(&self.account, tx).await?;
        Ok(JsonRpcResponse::new(id, Value::String(format!("0x{}", alloy::hex::encode(hash)))))
    }

    async fn personal_sign(&self, id: i64, hex_message: &str) -> Result<JsonRpcResponse, DispatchError> {
        let digits = hex_message.strip_prefix("0x").unwrap_or(hex_message);
        // Exactly one prefix is stripped; the hex decoder would drop a second one.
        if digits.starts_with("0x") {
            return Err(DispatchError::InvalidParams(format!(
                "message has a repeated 0x prefix: {hex_message}"
            )));
        }
        let message = alloy::hex::decode(digits)
            .map_err(|e| DispatchError::InvalidParams(format!("message is not hex: {e}")))?;

        let summary = format!("Message to sign:\n{}", String::from_utf8_lossy(&message));
        self.confirmer.confirm(&summary).await?;

        let signature = self.account.personal_sign(&message)?;
        Ok(JsonRpcResponse::new(
            id,
            Value::String(format!("0x{}", alloy::hex::encode(signature))),
        ))
    }
}

/// Validate `eth_sendTransaction` params into a [`TxRequest`].
fn transaction_request(params: &TransactionParams) -> Result<TxRequest, DispatchError> {
    let to = parse_address(&params.to)?;
    let data = params.data.as_deref().map(parse_data).transpose()?.unwrap_or_default();
    let value = params.value.as_deref().map(parse_quantity).transpose()?.unwrap_or_default();
    let gas = params
        .gas
        .as_deref()
        .map(parse_quantity)
        .transpose()?
        .map(|gas| u64::try_from(gas).map_err(|_| DispatchError::InvalidParams(format!("gas out of range: {gas}"))))
        .transpose()?
        .filter(|gas| *gas > 0);

    Ok(TxRequest { to, data, value, gas })
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn chain_label(chain_id: &Value) -> String {
    match chain_id {
        Value::Null => "not specified".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Why a request produced no response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Confirmation(#[from] ConfirmError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
