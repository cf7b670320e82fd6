//! Node pool supervisor with background health probing
//!
//! Owns a fixed set of node connections for one chain, re-ranks them by
//! reported height every probe interval, and serves selection queries to
//! any number of concurrent callers.

use super::NodeClient;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Snapshot of one probe round, replaced atomically under the write lock
struct PoolState {
    /// Index of the current best node
    active: usize,
    /// Maximum height observed in the most recent round
    height: u64,
    /// Freshness flag per node, parallel to the node list
    live: Vec<bool>,
    /// False when no node answered the last round
    available: bool,
    /// Rotating pointer for round-robin selection
    cursor: usize,
}

/// Per-chain node pool supervisor
///
/// Constructed once per chain; the background probe task runs for as long
/// as the pool is reachable.
pub struct NodePool<T: NodeClient> {
    chain_id: u64,
    nodes: Vec<Arc<T>>,
    interval: Duration,
    max_gap: u64,
    state: RwLock<PoolState>,
}

impl<T: NodeClient> NodePool<T> {
    /// Create a pool over pre-built connections.
    ///
    /// Runs one probe round synchronously; fails if no node answers. On
    /// success the periodic background probe is started.
    pub async fn new(
        chain_id: u64,
        nodes: Vec<Arc<T>>,
        interval: Duration,
        max_gap: u64,
    ) -> BridgeResult<Arc<Self>> {
        if nodes.is_empty() {
            return Err(BridgeError::NoNodesConfigured { chain_id });
        }

        info!("Initializing node pool for chain {}", chain_id);

        let count = nodes.len();
        let pool = Arc::new(Self {
            chain_id,
            nodes,
            interval,
            max_gap,
            state: RwLock::new(PoolState {
                active: 0,
                height: 0,
                live: vec![false; count],
                available: false,
                cursor: 0,
            }),
        });

        pool.probe().await;
        if !pool.available().await {
            return Err(BridgeError::AllNodesUnavailable { chain_id });
        }

        // The probe loop holds a weak handle, so it winds down once every
        // owner of the pool is gone.
        let weak = Arc::downgrade(&pool);
        let interval = pool.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(pool) => pool.probe().await,
                    None => break,
                }
            }
        });

        Ok(pool)
    }

    /// Create a pool from endpoint URLs and a connection factory
    pub async fn from_urls<F>(
        chain_id: u64,
        urls: &[String],
        interval: Duration,
        max_gap: u64,
        factory: F,
    ) -> BridgeResult<Arc<Self>>
    where
        F: Fn(&str) -> BridgeResult<T>,
    {
        let mut nodes = Vec::with_capacity(urls.len());
        for url in urls {
            nodes.push(Arc::new(factory(url)?));
        }
        Self::new(chain_id, nodes, interval, max_gap).await
    }

    /// One probe round: query every node, rank, publish the new snapshot.
    ///
    /// All network calls complete before the lock is taken; readers only
    /// ever observe a fully published round.
    async fn probe(&self) {
        let queries = self.nodes.iter().map(|node| node.latest_height());
        let results = join_all(queries).await;

        let mut heights = vec![0u64; self.nodes.len()];
        let mut best: Option<usize> = None;
        let mut height = 0u64;
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(h) => {
                    heights[i] = h;
                    if best.is_none() || h > height {
                        height = h;
                        best = Some(i);
                    }
                }
                Err(e) => {
                    warn!("Node({}) error {}", self.nodes[i].address(), e);
                    metrics::record_probe_failure(self.chain_id);
                }
            }
        }

        let available = best.is_some();
        if !available {
            warn!(
                "Temporary unavailability for all nodes of chain {}",
                self.chain_id
            );
        }
        let active = best.unwrap_or(0);
        let live: Vec<bool> = heights
            .iter()
            .map(|&h| h >= height.saturating_sub(self.max_gap))
            .collect();

        metrics::record_chain_height(self.chain_id, height);
        metrics::record_chain_available(self.chain_id, available);

        let mut state = self.state.write().await;
        state.active = active;
        state.height = height;
        state.available = available;
        state.live = live;
    }

    /// Chain identifier this pool serves
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Maximum height observed in the last published round
    pub async fn height(&self) -> u64 {
        self.state.read().await.height
    }

    /// Whether any node answered the last published round
    pub async fn available(&self) -> bool {
        self.state.read().await.available
    }

    /// Position of the active connection in the node list
    pub async fn index(&self) -> usize {
        self.state.read().await.active
    }

    /// The current best connection.
    ///
    /// Degraded rounds fall back to the node at index 0, so this always
    /// returns a connection once construction succeeded.
    pub async fn node(&self) -> Arc<T> {
        let state = self.state.read().await;
        self.nodes[state.active].clone()
    }

    /// Connection at a specific index, for callers fanning out via
    /// [`NodePool::select`]
    pub fn node_at(&self, index: usize) -> Arc<T> {
        self.nodes[index].clone()
    }

    /// Advance the rotating cursor to the next live node and return its
    /// index.
    ///
    /// When no node is live the cursor still advances once and the walk is
    /// bounded to a single wrap, returning whichever index it lands on.
    pub async fn select(&self) -> usize {
        let mut state = self.state.write().await;
        let count = self.nodes.len();
        let start = state.cursor % count;
        state.cursor += 1;
        let mut c = state.cursor % count;
        while c != start {
            if state.live[c] {
                break;
            }
            state.cursor += 1;
            c = state.cursor % count;
        }
        state.cursor = c;
        c
    }

    /// Block until the chain reaches `height`, polling the active node.
    ///
    /// Query errors are logged and treated as not-yet-reached. There is no
    /// timeout; callers bound the wait by dropping the future. Returns the
    /// height that satisfied the wait.
    pub async fn wait_till_height(&self, height: u64, interval: Option<Duration>) -> u64 {
        let interval = interval.unwrap_or(self.interval);
        loop {
            match self.node().await.latest_height().await {
                Ok(h) if h >= height => return h,
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to get chain {} latest height: {}", self.chain_id, e);
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct FakeNode {
        addr: String,
        height: AtomicU64,
        failing: AtomicBool,
    }

    impl FakeNode {
        fn at(index: usize, height: u64) -> Arc<Self> {
            Arc::new(Self {
                addr: format!("http://node-{}.test", index),
                height: AtomicU64::new(height),
                failing: AtomicBool::new(false),
            })
        }

        fn set_height(&self, height: u64) {
            self.height.store(height, Ordering::SeqCst);
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl NodeClient for FakeNode {
        async fn latest_height(&self) -> BridgeResult<u64> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BridgeError::ChainConnection {
                    chain_id: 2,
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.height.load(Ordering::SeqCst))
        }

        fn address(&self) -> &str {
            &self.addr
        }
    }

    // Long interval keeps the background probe out of the assertions.
    const IDLE: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_probe_ranks_nodes_by_height() {
        let nodes = vec![FakeNode::at(0, 100), FakeNode::at(1, 105), FakeNode::at(2, 98)];
        let pool = NodePool::new(2, nodes, IDLE, 5).await.unwrap();

        assert_eq!(pool.height().await, 105);
        assert_eq!(pool.index().await, 1);
        assert!(pool.available().await);
        assert_eq!(pool.node().await.address(), "http://node-1.test");
        assert_eq!(pool.state.read().await.live, vec![true, true, false]);
    }

    #[tokio::test]
    async fn test_first_node_wins_height_ties() {
        let nodes = vec![FakeNode::at(0, 50), FakeNode::at(1, 50)];
        let pool = NodePool::new(2, nodes, IDLE, 10).await.unwrap();
        assert_eq!(pool.index().await, 0);
    }

    #[tokio::test]
    async fn test_construction_fails_with_no_nodes() {
        let pool = NodePool::<FakeNode>::new(2, vec![], IDLE, 5).await;
        assert!(matches!(
            pool,
            Err(BridgeError::NoNodesConfigured { chain_id: 2 })
        ));
    }

    #[tokio::test]
    async fn test_construction_fails_when_all_nodes_down() {
        let nodes = vec![FakeNode::at(0, 100), FakeNode::at(1, 100)];
        for node in &nodes {
            node.set_failing(true);
        }
        let pool = NodePool::new(2, nodes, IDLE, 5).await;
        assert!(matches!(
            pool,
            Err(BridgeError::AllNodesUnavailable { chain_id: 2 })
        ));
    }

    #[tokio::test]
    async fn test_degraded_round_falls_back_to_first_node() {
        let nodes = vec![FakeNode::at(0, 100), FakeNode::at(1, 105)];
        let pool = NodePool::new(2, nodes.clone(), IDLE, 5).await.unwrap();
        assert_eq!(pool.index().await, 1);

        for node in &nodes {
            node.set_failing(true);
        }
        pool.probe().await;

        assert!(!pool.available().await);
        assert_eq!(pool.index().await, 0);
        assert_eq!(pool.node().await.address(), "http://node-0.test");

        // A later successful round restores availability.
        nodes[1].set_failing(false);
        nodes[1].set_height(110);
        pool.probe().await;
        assert!(pool.available().await);
        assert_eq!(pool.height().await, 110);
        assert_eq!(pool.index().await, 1);
    }

    #[tokio::test]
    async fn test_liveness_recomputed_without_stickiness() {
        let nodes = vec![FakeNode::at(0, 100), FakeNode::at(1, 100)];
        let pool = NodePool::new(2, nodes.clone(), IDLE, 5).await.unwrap();
        assert_eq!(pool.state.read().await.live, vec![true, true]);

        nodes[0].set_height(200);
        pool.probe().await;
        assert_eq!(pool.state.read().await.live, vec![true, false]);

        nodes[1].set_height(199);
        pool.probe().await;
        assert_eq!(pool.state.read().await.live, vec![true, true]);
    }

    #[tokio::test]
    async fn test_failed_node_counts_as_height_zero_and_gap_saturates() {
        let nodes = vec![FakeNode::at(0, 10), FakeNode::at(1, 10)];
        nodes[1].set_failing(true);
        // Gap wide enough to cover zero keeps the dead node live.
        let pool = NodePool::new(2, nodes.clone(), IDLE, 100).await.unwrap();
        assert_eq!(pool.state.read().await.live, vec![true, true]);

        // A tight gap drops it.
        nodes[0].set_height(200);
        let pool = NodePool::new(2, nodes, IDLE, 5).await.unwrap();
        assert_eq!(pool.state.read().await.live, vec![true, false]);
    }

    #[tokio::test]
    async fn test_select_rotates_over_live_nodes_only() {
        let nodes = vec![FakeNode::at(0, 105), FakeNode::at(1, 60), FakeNode::at(2, 104)];
        let pool = NodePool::new(2, nodes, IDLE, 5).await.unwrap();
        assert_eq!(pool.state.read().await.live, vec![true, false, true]);

        // Node 1 is stale and never visited.
        assert_eq!(pool.select().await, 2);
        assert_eq!(pool.select().await, 0);
        assert_eq!(pool.select().await, 2);
        assert_eq!(pool.select().await, 0);
    }

    #[tokio::test]
    async fn test_select_bounded_when_none_live() {
        let nodes = vec![FakeNode::at(0, 100), FakeNode::at(1, 100), FakeNode::at(2, 100)];
        let pool = NodePool::new(2, nodes, IDLE, 5).await.unwrap();

        // No probe round produces an all-stale view (the best node is
        // always live), so force one to pin the bounded-wrap behavior.
        pool.state.write().await.live = vec![false, false, false];

        let index = pool.select().await;
        assert!(index < 3);
        // Still terminates and stays in range on repeated calls.
        let index = pool.select().await;
        assert!(index < 3);
    }

    #[tokio::test]
    async fn test_wait_till_height_returns_once_reached() {
        let nodes = vec![FakeNode::at(0, 100)];
        let pool = NodePool::new(2, nodes.clone(), IDLE, 5).await.unwrap();

        assert_eq!(pool.wait_till_height(90, None).await, 100);

        let node = nodes[0].clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            node.set_height(120);
        });
        let reached = pool
            .wait_till_height(120, Some(Duration::from_millis(5)))
            .await;
        assert_eq!(reached, 120);
    }

    #[tokio::test]
    async fn test_wait_till_height_tolerates_query_errors() {
        let nodes = vec![FakeNode::at(0, 100)];
        let pool = NodePool::new(2, nodes.clone(), IDLE, 5).await.unwrap();

        nodes[0].set_failing(true);
        let node = nodes[0].clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            node.set_failing(false);
            node.set_height(130);
        });
        let reached = pool
            .wait_till_height(130, Some(Duration::from_millis(5)))
            .await;
        assert_eq!(reached, 130);
    }
}
