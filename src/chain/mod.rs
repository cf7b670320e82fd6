//! Chain module - node connectivity for one chain
//!
//! This module provides:
//! - Capability traits the core requires from a node connection
//! - The node pool supervisor with background health probing
//! - An ethers-backed client implementing the capability traits

pub mod evm;
pub mod pool;

pub use evm::EvmClient;
pub use pool::NodePool;

use crate::error::BridgeResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, H256, U256};

/// Minimal operations the node pool requires from a connection
#[async_trait]
pub trait NodeClient: Send + Sync + 'static {
    /// Latest block height observed by this endpoint
    async fn latest_height(&self) -> BridgeResult<u64>;

    /// Endpoint identity, for logging
    fn address(&self) -> &str;
}

/// Richer per-chain operations the transaction sender requires
#[async_trait]
pub trait ChainClient: NodeClient {
    /// Suggested gas price
    async fn gas_price(&self) -> BridgeResult<U256>;

    /// Estimate the gas limit for a call
    async fn estimate_gas(&self, tx: &TypedTransaction) -> BridgeResult<u64>;

    /// Transaction count for an account; `pending` includes the mempool
    async fn transaction_count(&self, account: Address, pending: bool) -> BridgeResult<u64>;

    /// Broadcast a raw signed transaction
    async fn send_raw_transaction(&self, raw: Bytes) -> BridgeResult<H256>;
}
