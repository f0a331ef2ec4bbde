//! End-to-end scenarios exercising the full mutation -> debounce -> compute
//! -> emit pipeline through the public `Engine` surface.

use std::sync::Arc;
use std::time::Duration;

use trade_engine::{Engine, InventoryItem};
use trade_types::{EngineConfig, LoopStatus, NullResolver, TenantId, WalletId};

/// Scenario tests drive several debounce/compute rounds per tenant; routing
/// the worker's `tracing` output through the test writer makes a failure's
/// round-by-round history visible in `cargo test -- --nocapture` instead of
/// only the final assertion. Safe to call from every test: `try_init`
/// no-ops once a global subscriber is already installed.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn wait_until<F: Fn() -> bool>(predicate: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.debounce_window_ms = 5;
    config
}

fn engine() -> Engine {
    Engine::new(Arc::new(NullResolver), fast_config())
}

#[tokio::test]
async fn s1_two_cycle() {
    init_tracing();
    let engine = engine();
    let tenant = TenantId::from("t1");

    engine
        .submit_inventory(
            &tenant,
            WalletId::from("alice"),
            vec![InventoryItem { nft: "A".into(), collection: "k".into(), valuation_hint: None }],
        )
        .await
        .unwrap();
    engine
        .submit_inventory(
            &tenant,
            WalletId::from("bob"),
            vec![InventoryItem { nft: "B".into(), collection: "k".into(), valuation_hint: None }],
        )
        .await
        .unwrap();
    engine
        .submit_wants(&tenant, WalletId::from("alice"), vec!["B".into()], vec![])
        .await
        .unwrap();
    engine
        .submit_wants(&tenant, WalletId::from("bob"), vec!["A".into()], vec![])
        .await
        .unwrap();

    let found = wait_until(
        || !engine.get_loops_for_wallet(&tenant, &WalletId::from("alice")).is_empty(),
        Duration::from_secs(2),
    )
    .await;
    assert!(found, "expected a 2-cycle to be discovered");

    let loops = engine.get_loops_for_wallet(&tenant, &WalletId::from("alice"));
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].efficiency, 1.0);
    assert_eq!(loops[0].participant_count(), 2);
    assert_eq!(loops[0].status, LoopStatus::Active, "a surfaced loop is Active, not Pending");
}

#[tokio::test]
async fn s2_three_cycle_discovered_on_closing_want() {
    init_tracing();
    let engine = engine();
    let tenant = TenantId::from("t2");

    for (wallet, nft) in [("alice", "A"), ("bob", "B"), ("carol", "C")] {
        engine
            .submit_inventory(
                &tenant,
                WalletId::from(wallet),
                vec![InventoryItem { nft: nft.into(), collection: "k".into(), valuation_hint: None }],
            )
            .await
            .unwrap();
    }
    engine.submit_wants(&tenant, WalletId::from("alice"), vec!["B".into()], vec![]).await.unwrap();
    engine.submit_wants(&tenant, WalletId::from("bob"), vec!["C".into()], vec![]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(engine.get_loops_for_wallet(&tenant, &WalletId::from("carol")).is_empty());

    engine.submit_wants(&tenant, WalletId::from("carol"), vec!["A".into()], vec![]).await.unwrap();

    let found = wait_until(
        || !engine.get_loops_for_wallet(&tenant, &WalletId::from("carol")).is_empty(),
        Duration::from_secs(2),
    )
    .await;
    assert!(found, "expected a 3-cycle to be discovered after the closing want");

    let loops = engine.get_loops_for_wallet(&tenant, &WalletId::from("carol"));
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].participant_count(), 3);
}

#[tokio::test]
async fn s3_removal_invalidates_loop() {
    init_tracing();
    let engine = engine();
    let tenant = TenantId::from("t3");

    for (wallet, nft) in [("alice", "A"), ("bob", "B"), ("carol", "C")] {
        engine
            .submit_inventory(
                &tenant,
                WalletId::from(wallet),
                vec![InventoryItem { nft: nft.into(), collection: "k".into(), valuation_hint: None }],
            )
            .await
            .unwrap();
    }
    engine.submit_wants(&tenant, WalletId::from("alice"), vec!["B".into()], vec![]).await.unwrap();
    engine.submit_wants(&tenant, WalletId::from("bob"), vec!["C".into()], vec![]).await.unwrap();
    engine.submit_wants(&tenant, WalletId::from("carol"), vec!["A".into()], vec![]).await.unwrap();

    assert!(
        wait_until(
            || !engine.get_loops_for_wallet(&tenant, &WalletId::from("alice")).is_empty(),
            Duration::from_secs(2),
        )
        .await
    );

    engine
        .remove_wants(&tenant, WalletId::from("bob"), vec!["C".into()], vec![])
        .await
        .unwrap();

    let cleared = wait_until(
        || {
            engine.get_loops_for_wallet(&tenant, &WalletId::from("alice")).is_empty()
                && engine.get_loops_for_wallet(&tenant, &WalletId::from("bob")).is_empty()
                && engine.get_loops_for_wallet(&tenant, &WalletId::from("carol")).is_empty()
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(cleared, "removing the closing want should invalidate the loop for all participants");
}

#[tokio::test]
async fn s4_collection_want_expansion() {
    init_tracing();
    let engine = engine();
    let tenant = TenantId::from("t4");

    engine
        .submit_inventory(
            &tenant,
            WalletId::from("alice"),
            vec![InventoryItem { nft: "A".into(), collection: "other".into(), valuation_hint: None }],
        )
        .await
        .unwrap();
    engine
        .submit_inventory(
            &tenant,
            WalletId::from("bob"),
            vec![InventoryItem { nft: "B".into(), collection: "k".into(), valuation_hint: None }],
        )
        .await
        .unwrap();
    engine.submit_wants(&tenant, WalletId::from("alice"), vec![], vec!["k".into()]).await.unwrap();
    engine.submit_wants(&tenant, WalletId::from("bob"), vec!["A".into()], vec![]).await.unwrap();

    let found = wait_until(
        || !engine.get_loops_for_wallet(&tenant, &WalletId::from("alice")).is_empty(),
        Duration::from_secs(2),
    )
    .await;
    assert!(found, "expected the collection want to materialize NFT_B");
    let loops = engine.get_loops_for_wallet(&tenant, &WalletId::from("alice"));
    assert!(loops[0].steps.iter().any(|s| s.nft == "B".into()));

    engine
        .upsert_collection_membership(&tenant, "k".into(), "B".into(), false)
        .await
        .unwrap();

    let cleared = wait_until(
        || engine.get_loops_for_wallet(&tenant, &WalletId::from("alice")).is_empty(),
        Duration::from_secs(2),
    )
    .await;
    assert!(cleared, "removing NFT_B from the collection should invalidate the loop");
}

#[tokio::test]
async fn s5_depth_bound() {
    init_tracing();
    let tenant = TenantId::from("t5");
    let n = 12;
    let wallet = |i: usize| WalletId::from(format!("w{i}"));
    let nft = |i: usize| trade_types::NftId::from(format!("n{i}"));

    let mut config = fast_config();
    config.max_depth = 10;
    let engine = Engine::new(Arc::new(NullResolver), config);

    for i in 0..n {
        engine
            .submit_inventory(
                &tenant,
                wallet(i),
                vec![InventoryItem { nft: nft(i), collection: "k".into(), valuation_hint: None }],
            )
            .await
            .unwrap();
    }
    for i in 0..n {
        let next = (i + 1) % n;
        engine.submit_wants(&tenant, wallet(i), vec![nft(next)], vec![]).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(
        engine.get_loops_for_wallet(&tenant, &wallet(0)).is_empty(),
        "a 12-cycle should not be emitted when maxDepth = 10"
    );
}

#[tokio::test]
async fn s6_canonical_dedup_across_enumerations() {
    init_tracing();
    let engine = engine();
    let tenant = TenantId::from("t6");

    for (wallet, nft) in [("a", "na"), ("b", "nb"), ("c", "nc")] {
        engine
            .submit_inventory(
                &tenant,
                WalletId::from(wallet),
                vec![InventoryItem { nft: nft.into(), collection: "k".into(), valuation_hint: None }],
            )
            .await
            .unwrap();
    }
    engine.submit_wants(&tenant, WalletId::from("a"), vec!["nb".into()], vec![]).await.unwrap();
    engine.submit_wants(&tenant, WalletId::from("b"), vec!["nc".into()], vec![]).await.unwrap();
    engine.submit_wants(&tenant, WalletId::from("c"), vec!["na".into()], vec![]).await.unwrap();

    let found = wait_until(
        || !engine.get_loops_for_wallet(&tenant, &WalletId::from("a")).is_empty(),
        Duration::from_secs(2),
    )
    .await;
    assert!(found);

    let ids_a: Vec<String> = engine
        .get_loops_for_wallet(&tenant, &WalletId::from("a"))
        .into_iter()
        .map(|l| l.canonical_id)
        .collect();
    let ids_b: Vec<String> = engine
        .get_loops_for_wallet(&tenant, &WalletId::from("b"))
        .into_iter()
        .map(|l| l.canonical_id)
        .collect();
    assert_eq!(ids_a.len(), 1);
    assert_eq!(ids_a, ids_b, "the same 3-cycle observed from either participant must share a canonical id");
}
