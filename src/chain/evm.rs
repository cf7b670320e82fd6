//! Ethers-backed node client for EVM chains

use super::{ChainClient, NodeClient};
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::time::Duration;

/// HTTP JSON-RPC client for one EVM endpoint
pub struct EvmClient {
    chain_id: u64,
    url: String,
    provider: Provider<Http>,
}

impl EvmClient {
    /// Connect to an endpoint URL. Fails only on a malformed URL; the
    /// first actual network round-trip happens in the pool's probe.
    pub fn connect(chain_id: u64, url: &str) -> BridgeResult<Self> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| BridgeError::Config(format!("Invalid RPC url {}: {}", url, e)))?
            .interval(Duration::from_millis(100));

        Ok(Self {
            chain_id,
            url: url.to_string(),
            provider,
        })
    }
}

#[async_trait]
impl NodeClient for EvmClient {
    async fn latest_height(&self) -> BridgeResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|b| b.as_u64())
            .map_err(|e| BridgeError::ChainConnection {
                chain_id: self.chain_id,
                message: e.to_string(),
            })
    }

    fn address(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    async fn gas_price(&self) -> BridgeResult<U256> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| BridgeError::GasEstimation(e.to_string()))
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> BridgeResult<u64> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map(|g| g.as_u64())
            .map_err(|e| BridgeError::GasEstimation(e.to_string()))
    }

    async fn transaction_count(&self, account: Address, pending: bool) -> BridgeResult<u64> {
        let block = pending.then(|| BlockId::Number(BlockNumber::Pending));
        self.provider
            .get_transaction_count(account, block)
            .await
            .map(|n| n.as_u64())
            .map_err(|e| BridgeError::Nonce {
                account: format!("{:?}", account),
                message: e.to_string(),
            })
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BridgeResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| BridgeError::Transaction(e.to_string()))?;
        Ok(pending.tx_hash())
    }
}
