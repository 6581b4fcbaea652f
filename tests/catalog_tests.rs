mod support;

use std::sync::Arc;

use pendlewatch::catalog::CatalogSync;
use pendlewatch::domain::MarketId;
use pendlewatch::service::Event;
use pendlewatch::store::MarketStore;
use pendlewatch::testkit::domain;
use pendlewatch::testkit::providers::ScriptedCatalog;

use support::{harness, Harness};

fn sync(h: &Harness, catalog: Arc<ScriptedCatalog>) -> CatalogSync {
    CatalogSync::new(
        Arc::clone(&h.config),
        catalog,
        h.store.clone(),
        Arc::clone(&h.notifiers),
    )
}

#[tokio::test]
async fn churn_is_reported_between_passes() {
    let h = harness();
    let catalog = Arc::new(ScriptedCatalog::with_markets(vec![
        domain::summary(1, "0xaa"),
        domain::summary(1, "0xbb"),
    ]));
    let sync = sync(&h, catalog.clone());

    // First pass against an empty store: everything is new.
    let entry = sync.sync().await.unwrap();
    assert_eq!(entry.added, ["1-0xaa", "1-0xbb"]);
    assert!(entry.removed.is_empty());

    // 0xbb leaves, 0xcc arrives.
    catalog.set_markets(vec![domain::summary(1, "0xaa"), domain::summary(1, "0xcc")]);
    let entry = sync.sync().await.unwrap();
    assert_eq!(entry.added, ["1-0xcc"]);
    assert_eq!(entry.removed, ["1-0xbb"]);
}

#[tokio::test]
async fn departed_markets_are_retired_not_deleted() {
    let h = harness();
    let catalog = Arc::new(ScriptedCatalog::with_markets(vec![
        domain::summary(1, "0xaa"),
        domain::summary(1, "0xbb"),
    ]));
    let sync = sync(&h, catalog.clone());
    sync.sync().await.unwrap();

    let departed = MarketId::new(1, "0xbb");
    h.store.set_monitored(&departed, true).unwrap();

    catalog.set_markets(vec![domain::summary(1, "0xaa")]);
    sync.sync().await.unwrap();

    let market = h.store.get_market(&departed).unwrap().unwrap();
    assert!(!market.monitored);
}

#[tokio::test]
async fn quiet_passes_append_no_history() {
    let h = harness();
    let catalog = Arc::new(ScriptedCatalog::with_markets(vec![domain::summary(
        1, "0xaa",
    )]));
    let sync = sync(&h, catalog);

    sync.sync().await.unwrap();
    sync.sync().await.unwrap();

    // Only the first pass had churn.
    assert_eq!(h.store.history().unwrap().len(), 1);
}

#[tokio::test]
async fn markets_below_the_volume_floor_are_skipped() {
    let h = harness();
    let mut config = domain::test_config();
    config.scheduler.min_volume_24h = 500_000.0;

    let mut thin = domain::summary(1, "0xaa");
    thin.volume_24h = Some(100_000.0);
    let mut deep = domain::summary(1, "0xbb");
    deep.volume_24h = Some(900_000.0);

    let catalog = Arc::new(ScriptedCatalog::with_markets(vec![thin, deep]));
    let sync = CatalogSync::new(
        Arc::new(config),
        catalog,
        h.store.clone(),
        Arc::clone(&h.notifiers),
    );

    let entry = sync.sync().await.unwrap();
    assert_eq!(entry.added, ["1-0xbb"]);
    assert!(h.store.get_market(&MarketId::new(1, "0xaa")).unwrap().is_none());
}

#[tokio::test]
async fn every_pass_notifies_a_catalog_event() {
    let h = harness();
    let catalog = Arc::new(ScriptedCatalog::with_markets(vec![domain::summary(
        1, "0xaa",
    )]));
    let sync = sync(&h, catalog);

    sync.sync().await.unwrap();
    sync.sync().await.unwrap();

    let events = h.events.lock();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, Event::CatalogSynced(_))));
}
