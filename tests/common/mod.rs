//! Common test utilities for integration tests
//!
//! Builds a miner seeded into the in-memory upstream mocks so tests only
//! describe what differs from the baseline.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lotus_adapter::adapters::mock::{MockMinerApi, MockNodeApi};
use lotus_adapter::domain::models::Address;
use lotus_adapter::services::{AggregationEngine, CachedGateway, TtlCache};

pub const BLOCK_DELAY_SECS: u64 = 30;

pub fn addr(s: &str) -> Address {
    s.parse().expect("valid test address")
}

/// Mocks plus an engine over them, with miner `f01000` fully seeded.
pub struct Fixture {
    pub node: Arc<MockNodeApi>,
    pub miner: Arc<MockMinerApi>,
    pub engine: Arc<AggregationEngine>,
    pub miner_addr: Address,
    pub owner: Address,
    pub worker: Address,
}

impl Fixture {
    pub async fn new() -> Self {
        setup_test_logging();

        let node = Arc::new(MockNodeApi::new());
        let miner = Arc::new(MockMinerApi::new());
        let miner_addr = addr("f01000");
        let owner = addr("f0100");
        let worker = addr("f0101");

        node.set_height(1_000).await;
        node.seed_miner(&miner_addr, &owner, &worker, 10).await;
        miner.set_actor(&miner_addr).await;
        miner.add_sector(1, "Proving").await;
        miner.add_sector(2, "PreCommit1").await;
        miner.add_worker("w-1", "sealer-01", true).await;
        miner.add_job("w-1", 2, "seal/v0/precommit/1", 0).await;

        let engine = Arc::new(AggregationEngine::new(
            node.clone(),
            miner.clone(),
            BLOCK_DELAY_SECS,
        ));

        Self {
            node,
            miner,
            engine,
            miner_addr,
            owner,
            worker,
        }
    }

    pub fn gateway(&self, ttl: Duration, worker_ttl: Duration) -> CachedGateway {
        CachedGateway::new(self.engine.clone(), TtlCache::new(ttl), worker_ttl)
    }
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
