//! Nonce providers
//!
//! Both implementations satisfy the acquire-then-update contract; they
//! differ in where the truth lives. The cached provider keeps a local
//! monotonic sequence after one seed fetch, the pending provider asks the
//! chain every time.

use super::NonceProvider;
use crate::chain::{ChainClient, NodePool};
use crate::error::BridgeResult;

use async_trait::async_trait;
use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Nonce provider seeded from the chain's pending transaction count, then
/// advancing locally.
///
/// The mutex is held across the seed fetch so concurrent first acquires
/// cannot both seed; every acquire hands out a distinct value.
pub struct CachedNonceProvider<T: ChainClient> {
    pool: Arc<NodePool<T>>,
    account: Address,
    next: Mutex<Option<u64>>,
}

impl<T: ChainClient> CachedNonceProvider<T> {
    pub fn new(pool: Arc<NodePool<T>>, account: Address) -> Self {
        Self {
            pool,
            account,
            next: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<T: ChainClient> NonceProvider for CachedNonceProvider<T> {
    async fn acquire(&self) -> BridgeResult<u64> {
        let mut next = self.next.lock().await;
        let nonce = match *next {
            Some(n) => n,
            None => {
                self.pool
                    .node()
                    .await
                    .transaction_count(self.account, true)
                    .await?
            }
        };
        *next = Some(nonce + 1);
        debug!("Allocated nonce {} for account {:?}", nonce, self.account);
        Ok(nonce)
    }

    async fn update(&self, success: bool) {
        if success {
            return;
        }
        let mut next = self.next.lock().await;
        if let Some(n) = *next {
            *next = Some(n.saturating_sub(1));
        }
    }
}

/// Stateless nonce provider fetching the pending count on every acquire.
///
/// For low-rate senders that prefer chain truth over local bookkeeping;
/// rollback is a no-op because nothing was reserved locally.
pub struct PendingNonceProvider<T: ChainClient> {
    pool: Arc<NodePool<T>>,
    account: Address,
}

impl<T: ChainClient> PendingNonceProvider<T> {
    pub fn new(pool: Arc<NodePool<T>>, account: Address) -> Self {
        Self { pool, account }
    }
}

#[async_trait]
impl<T: ChainClient> NonceProvider for PendingNonceProvider<T> {
    async fn acquire(&self) -> BridgeResult<u64> {
        self.pool
            .node()
            .await
            .transaction_count(self.account, true)
            .await
    }

    async fn update(&self, _success: bool) {}
}
