//! Wallet: per-account transaction submission against a node pool
//!
//! Layers gas-price resolution, gas-limit estimation, nonce acquisition
//! and signing on top of the pool's currently selected connection, and
//! reconciles the nonce ledger on every outcome.

use super::gas;
use super::nonce::CachedNonceProvider;
use super::{NonceProvider, Provider};
use crate::chain::{ChainClient, NodePool};
use crate::config::ChainConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics;

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Active routing state: which account and provider new sends go through
struct Route {
    account: Option<Address>,
    provider: Option<Arc<dyn Provider>>,
    providers: HashMap<Address, Arc<dyn Provider>>,
}

/// Transaction sender for one chain's signing accounts
pub struct Wallet<T: ChainClient> {
    chain_id: u64,
    max_gas_limit: Option<u64>,
    pool: Arc<NodePool<T>>,
    route: RwLock<Route>,
    nonces: DashMap<Address, Arc<dyn NonceProvider>>,
}

impl<T: ChainClient> Wallet<T> {
    pub fn new(config: &ChainConfig, pool: Arc<NodePool<T>>) -> Self {
        Self {
            chain_id: config.chain_id,
            max_gas_limit: config.max_gas_limit,
            pool,
            route: RwLock::new(Route {
                account: None,
                provider: None,
                providers: HashMap::new(),
            }),
            nonces: DashMap::new(),
        }
    }

    /// Register a signing provider. Every account it reports becomes
    /// routable; the first account ever registered becomes active. New
    /// accounts get a cached nonce provider unless one was installed via
    /// [`Wallet::set_nonce_provider`].
    pub async fn register_provider(&self, provider: Arc<dyn Provider>) {
        let accounts = provider.accounts();
        let mut route = self.route.write().await;
        for account in &accounts {
            route.providers.insert(*account, provider.clone());
            self.nonces.entry(*account).or_insert_with(|| {
                Arc::new(CachedNonceProvider::new(self.pool.clone(), *account))
                    as Arc<dyn NonceProvider>
            });
        }
        if route.account.is_none() {
            if let Some(first) = accounts.first() {
                route.account = Some(*first);
                route.provider = Some(provider.clone());
            }
        }
        info!(
            "Registered provider with {} accounts for chain {}",
            accounts.len(),
            self.chain_id
        );
    }

    /// Replace the nonce provider for an account
    pub fn set_nonce_provider(&self, account: Address, nonces: Arc<dyn NonceProvider>) {
        self.nonces.insert(account, nonces);
    }

    /// Route subsequent sends through a registered account
    pub async fn select_account(&self, account: Address) -> BridgeResult<()> {
        let mut route = self.route.write().await;
        match route.providers.get(&account) {
            Some(provider) => {
                route.provider = Some(provider.clone());
                route.account = Some(account);
                Ok(())
            }
            None => Err(BridgeError::AccountNotRegistered {
                account: format!("{:?}", account),
            }),
        }
    }

    /// Snapshot of the account in use: (account, provider, nonce provider)
    pub async fn account(
        &self,
    ) -> BridgeResult<(Address, Arc<dyn Provider>, Arc<dyn NonceProvider>)> {
        let route = self.route.read().await;
        let account = route.account.ok_or_else(|| BridgeError::AccountNotRegistered {
            account: "<none>".to_string(),
        })?;
        let provider = route
            .provider
            .clone()
            .ok_or_else(|| BridgeError::AccountNotRegistered {
                account: format!("{:?}", account),
            })?;
        let nonces = self
            .nonces
            .get(&account)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BridgeError::Nonce {
                account: format!("{:?}", account),
                message: "no nonce provider installed".to_string(),
            })?;
        Ok((account, provider, nonces))
    }

    /// Build, sign and broadcast a transaction from the active account.
    ///
    /// A zero `gas_price` resolves to the chain's suggested price, scaled
    /// by `gas_price_multiplier` when given; a zero `gas_limit` triggers
    /// estimation. Failures before broadcast roll the nonce back; once a
    /// signed transaction was broadcast the nonce is consumed even if the
    /// broadcast reports an error.
    pub async fn send(
        &self,
        to: Address,
        amount: U256,
        gas_limit: u64,
        gas_price: U256,
        gas_price_multiplier: Option<f64>,
        data: Vec<u8>,
    ) -> BridgeResult<H256> {
        let mut gas_price = gas_price;
        if gas_price.is_zero() {
            gas_price = self.pool.node().await.gas_price().await?;
            if let Some(multiplier) = gas_price_multiplier {
                gas_price = gas::apply_multiplier(gas_price, multiplier);
            }
        }

        let (account, provider, nonces) = self.account().await?;
        let nonce = nonces.acquire().await?;
        let data = Bytes::from(data);

        let mut gas_limit = gas_limit;
        if gas_limit == 0 {
            let call: TypedTransaction = TransactionRequest::new()
                .from(account)
                .to(to)
                .gas_price(gas_price)
                .value(U256::zero())
                .data(data.clone())
                .into();
            match self.pool.node().await.estimate_gas(&call).await {
                Ok(estimated) => gas_limit = estimated,
                Err(e) => {
                    nonces.update(false).await;
                    return Err(e);
                }
            }
        }

        let ceiling = gas::gas_ceiling(self.max_gas_limit, gas_limit);
        if ceiling < gas_limit {
            nonces.update(false).await;
            return Err(BridgeError::GasLimitExceeded {
                limit: gas_limit,
                max: ceiling,
            });
        }

        let tx: TypedTransaction = TransactionRequest::new()
            .from(account)
            .to(to)
            .value(amount)
            .nonce(nonce)
            .gas(ceiling)
            .gas_price(gas_price)
            .data(data)
            .into();

        let signed = match provider.sign_tx(account, &tx, self.chain_id).await {
            Ok(signed) => signed,
            Err(e) => {
                nonces.update(false).await;
                return Err(e);
            }
        };

        let result = self.pool.node().await.send_raw_transaction(signed).await;
        // Check the result only after the nonce is committed; a broadcast
        // error still consumes the nonce.
        nonces.update(true).await;
        match &result {
            Ok(hash) => {
                debug!("Sent tx {:?} on chain {} nonce {}", hash, self.chain_id, nonce);
                metrics::record_tx_submitted(self.chain_id);
            }
            Err(e) => {
                warn!("Send tx failed on chain {}: {}", self.chain_id, e);
                metrics::record_tx_failed(self.chain_id);
            }
        }
        result
    }
}

/// In-memory signing backend over a set of local keys
pub struct LocalKeyProvider {
    wallets: HashMap<Address, LocalWallet>,
}

impl LocalKeyProvider {
    pub fn new(wallets: Vec<LocalWallet>) -> Self {
        Self {
            wallets: wallets.into_iter().map(|w| (w.address(), w)).collect(),
        }
    }

    /// Parse hex-encoded private keys
    pub fn from_keys(keys: &[String]) -> BridgeResult<Self> {
        let wallets = keys
            .iter()
            .map(|key| {
                key.parse::<LocalWallet>()
                    .map_err(|e| BridgeError::Signing(format!("Invalid private key: {}", e)))
            })
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(Self::new(wallets))
    }
}

#[async_trait]
impl Provider for LocalKeyProvider {
    async fn sign_tx(
        &self,
        account: Address,
        tx: &TypedTransaction,
        chain_id: u64,
    ) -> BridgeResult<Bytes> {
        let wallet = self
            .wallets
            .get(&account)
            .ok_or_else(|| BridgeError::AccountNotRegistered {
                account: format!("{:?}", account),
            })?
            .clone()
            .with_chain_id(chain_id);

        let mut tx = tx.clone();
        tx.set_chain_id(chain_id);
        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| BridgeError::Signing(e.to_string()))?;
        Ok(tx.rlp_signed(&signature))
    }

    fn accounts(&self) -> Vec<Address> {
        self.wallets.keys().copied().collect()
    }
}
