//! Error types for the bridge core

use thiserror::Error;

/// Main error type for the node-pool and transaction-submission layer
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    #[error("No nodes configured for chain {chain_id}")]
    NoNodesConfigured { chain_id: u64 },

    #[error("All nodes unavailable for chain {chain_id}")]
    AllNodesUnavailable { chain_id: u64 },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Gas limit {limit} exceeds chain maximum {max}")]
    GasLimitExceeded { limit: u64, max: u64 },

    #[error("Nonce error for account {account}: {message}")]
    Nonce { account: String, message: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Account {account} not registered")]
    AccountNotRegistered { account: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::ChainConnection { .. }
                | BridgeError::AllNodesUnavailable { .. }
                | BridgeError::Transaction(_)
        )
    }
}

/// Result type for bridge core operations
pub type BridgeResult<T> = Result<T, BridgeError>;
