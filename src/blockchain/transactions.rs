// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-1559 transaction submission over JSON-RPC.
//!
//! Gas is estimated and scaled by 1.3 unless a limit is configured or the
//! dApp supplied one. The fee cap is `2 * base_fee + tip`, leaving room for
//! base fee growth while the transaction is pending.

use alloy::{
    primitives::B256,
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;

use super::client::{ChainError, ChainSubmitter};
use super::signing::Account;
use super::types::{
    GasSettings, NetworkConfig, TxRequest, GAS_ESTIMATE_DENOMINATOR, GAS_ESTIMATE_NUMERATOR,
};

/// Used when the latest block carries no base fee (pre-London chains).
const FALLBACK_BASE_FEE_WEI: u128 = 25_000_000_000;

/// [`ChainSubmitter`] backed by an alloy HTTP provider.
#[derive(Debug, Clone)]
pub struct AlloySubmitter {
    network: NetworkConfig,
    url: url::Url,
    gas: GasSettings,
}

impl AlloySubmitter {
    /// Create a submitter for `network`. The RPC URL is validated here so a
    /// typo fails at startup rather than on the first request.
    pub fn new(network: NetworkConfig, gas: GasSettings) -> Result<Self, ChainError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        Ok(Self { network, url, gas })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let provider = ProviderBuilder::new().connect_http(self.url.clone());
        provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    /// Get current `(max_fee_per_gas, max_priority_fee_per_gas)`.
    async fn get_gas_prices<P: Provider>(&self, provider: &P) -> Result<(u128, u128), ChainError> {
        let block = provider
            .get_block_by_number(alloy::eips::BlockNumberOrTag::Latest)
            .await
            .map_err(|e| ChainError::RpcError(format!("Failed to get block: {}", e)))?
            .ok_or_else(|| ChainError::RpcError("No latest block".to_string()))?;

        let base_fee: u128 = block
            .header
            .base_fee_per_gas
            .map(|f| f as u128)
            .unwrap_or(FALLBACK_BASE_FEE_WEI);

        let priority_fee = self.gas.priority_fee_wei;
        let max_fee = base_fee.saturating_mul(2).saturating_add(priority_fee);

        Ok((max_fee, priority_fee))
    }
}

/// Gas limit to use: explicit config wins, then the dApp's value, then the
/// scaled estimate.
fn choose_gas_limit(configured: Option<u64>, requested: Option<u64>, estimate: Option<u64>) -> Option<u64> {
    configured.or(requested).or_else(|| {
        estimate.map(|gas| gas.saturating_mul(GAS_ESTIMATE_NUMERATOR) / GAS_ESTIMATE_DENOMINATOR)
    })
}

#[async_trait]
impl ChainSubmitter for AlloySubmitter {
    async fn submit(&self, sender: &Account, tx: TxRequest) -> Result<B256, ChainError> {
        let provider = ProviderBuilder::new()
            .wallet(sender.wallet())
            .connect_http(self.url.clone());

        let mut request = TransactionRequest::default()
            .from(sender.address())
            .to(tx.to)
            .value(tx.value);
        if !tx.data.is_empty() {
            request = request.input(tx.data.clone().into());
        }

        let estimate = if self.gas.gas_limit.is_none() && tx.gas.is_none() {
            let gas = provider
                .estimate_gas(request.clone())
                .await
                .map_err(|e| ChainError::RpcError(format!("Gas estimation failed: {}", e)))?;
            Some(gas)
        } else {
            None
        };
        if let Some(limit) = choose_gas_limit(self.gas.gas_limit, tx.gas, estimate) {
            request = request.gas_limit(limit);
        }

        let (max_fee_per_gas, priority_fee) = self.get_gas_prices(&provider).await?;
        request = request
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(priority_fee);

        tracing::debug!(
            from = %sender.address(),
            to = %tx.to,
            value = %tx.value,
            data_len = tx.data.len(),
            max_fee_per_gas = %max_fee_per_gas,
            priority_fee = %priority_fee,
            "eth_sendRawTransaction"
        );

        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to send: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        let hash_hex = format!("{:?}", tx_hash);
        match self.network.tx_url(&hash_hex) {
            Some(link) => tracing::info!(tx_hash = %hash_hex, explorer = %link, "Transaction submitted"),
            None => tracing::info!(tx_hash = %hash_hex, "Transaction submitted"),
        }

        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_gas_limit_precedence() {
        assert_eq!(choose_gas_limit(Some(50_000), Some(21_000), Some(100)), Some(50_000));
        assert_eq!(choose_gas_limit(None, Some(21_000), Some(100)), Some(21_000));
        assert_eq!(choose_gas_limit(None, None, Some(21_000)), Some(27_300));
        assert_eq!(choose_gas_limit(None, None, None), None);
    }

    #[test]
    fn test_new_rejects_bad_rpc_url() {
        let result = AlloySubmitter::new(NetworkConfig::custom("not a url"), GasSettings::default());
        assert!(matches!(result, Err(ChainError::InvalidRpcUrl(_))));
    }

    #[test]
    fn test_new_accepts_default_network() {
        let submitter = AlloySubmitter::new(NetworkConfig::default(), GasSettings::default()).unwrap();
        assert_eq!(submitter.network().name, "Avalanche Fuji Testnet");
    }
}
