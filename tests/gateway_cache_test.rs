//! Cached gateway behaviour against counting mock upstreams.

mod common;

use std::time::Duration;

use common::Fixture;
use lotus_adapter::domain::models::TipSetKey;

const LONG: Duration = Duration::from_secs(60);

#[tokio::test]
async fn test_repeat_call_within_ttl_hits_upstream_once() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, LONG);
    let head = TipSetKey::empty();

    let first = gw.state_miner_info(&fx.miner_addr, &head).await.unwrap();
    let second = gw.state_miner_info(&fx.miner_addr, &head).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.node.calls("StateMinerInfo").await, 1);
}

#[tokio::test]
async fn test_distinct_arguments_are_cached_separately() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, LONG);

    gw.wallet_balance(&fx.owner).await.unwrap();
    gw.wallet_balance(&fx.worker).await.unwrap();
    gw.wallet_balance(&fx.owner).await.unwrap();

    assert_eq!(fx.node.calls("WalletBalance").await, 2);
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(Duration::from_millis(50), LONG);

    gw.actor_address().await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    gw.actor_address().await.unwrap();

    assert_eq!(fx.miner.calls("ActorAddress").await, 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, LONG);

    fx.miner.fail("SectorsList").await;
    assert!(gw.sectors_list().await.is_err());

    fx.miner.recover("SectorsList").await;
    let sectors = gw.sectors_list().await.unwrap();

    assert_eq!(sectors, vec![1, 2]);
    assert_eq!(fx.miner.calls("SectorsList").await, 2);
}

#[tokio::test]
async fn test_composite_views_are_cached_as_a_whole() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, LONG);

    let first = gw.miner_asset_info(&fx.miner_addr).await.unwrap();
    let upstream_calls = fx.node.total_calls().await;
    let second = gw.miner_asset_info(&fx.miner_addr).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.node.total_calls().await, upstream_calls);
}

#[tokio::test]
async fn test_worker_views_use_short_ttl() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, Duration::from_millis(50));

    gw.worker_task_info().await.unwrap();
    gw.storage_info().await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    gw.worker_task_info().await.unwrap();
    gw.storage_info().await.unwrap();

    assert_eq!(fx.miner.calls("WorkerJobs").await, 2);
    assert_eq!(fx.miner.calls("StorageList").await, 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_upstream_call() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, LONG);

    let calls: Vec<_> = (0..8)
        .map(|_| {
            let gw = gw.clone();
            tokio::spawn(async move { gw.miner_sectors_info().await })
        })
        .collect();
    for call in calls {
        let info = call.await.unwrap().unwrap();
        assert_eq!(info.total_sectors, 2);
        assert_eq!(info.proving, 1);
    }

    assert_eq!(fx.miner.calls("SectorsList").await, 1);
}

#[tokio::test]
async fn test_sectors_status_keyed_by_show_flag() {
    let fx = Fixture::new().await;
    let gw = fx.gateway(LONG, LONG);

    gw.sectors_status(1, false).await.unwrap();
    gw.sectors_status(1, true).await.unwrap();
    gw.sectors_status(1, false).await.unwrap();

    assert_eq!(fx.miner.calls("SectorsStatus").await, 2);
}
