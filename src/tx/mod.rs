//! Transaction submission module
//!
//! This module provides:
//! - Capability traits for signing backends and nonce providers
//! - Nonce provider implementations (cached and fetch-per-acquire)
//! - The wallet state machine layering gas, nonce and signing on top of a
//!   node pool

pub mod gas;
pub mod nonce;
pub mod sender;

pub use nonce::{CachedNonceProvider, PendingNonceProvider};
pub use sender::{LocalKeyProvider, Wallet};

use crate::error::BridgeResult;

use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
#[cfg(test)]
use mockall::automock;

/// Signing backend capable of producing a signed transaction for an
/// account it owns
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Sign a transaction draft for the chain's numeric identifier,
    /// returning the raw bytes ready for broadcast
    async fn sign_tx(
        &self,
        account: Address,
        tx: &TypedTransaction,
        chain_id: u64,
    ) -> BridgeResult<Bytes>;

    /// Accounts this backend can sign for
    fn accounts(&self) -> Vec<Address>;
}

/// Per-account nonce ledger
///
/// `update` must be called exactly once per successful `acquire`: `true`
/// commits the value permanently, `false` returns it for reuse.
/// Implementations must serialize concurrent acquires for one account.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NonceProvider: Send + Sync {
    async fn acquire(&self) -> BridgeResult<u64>;

    async fn update(&self, success: bool);
}
