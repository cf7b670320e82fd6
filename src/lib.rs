//! bridge-core - shared node connectivity and transaction submission for
//! multi-chain bridge relayers
//!
//! Each chain gets a [`NodePool`] that continuously ranks its configured
//! RPC endpoints by reported height and hands out the freshest connection,
//! and a [`Wallet`] that serializes nonce handling per signing account
//! while layering gas resolution and signing on top of the pool.

pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod tx;

pub use chain::{ChainClient, EvmClient, NodeClient, NodePool};
pub use config::{ChainConfig, Settings};
pub use error::{BridgeError, BridgeResult};
pub use tx::{
    CachedNonceProvider, LocalKeyProvider, NonceProvider, PendingNonceProvider, Provider, Wallet,
};
