mod support;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use pendlewatch::error::{Error, QuoteError};
use pendlewatch::quote::QuoteOrchestrator;
use pendlewatch::testkit::domain;

use support::{harness, yt_units};

#[tokio::test]
async fn composite_ranks_aggregators_by_usd_value() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(101)));
    h.quotes
        .aggregator_returns("odos", domain::raw_quote("odos", yt_units(103)));

    let composite = h.orchestrator.quote(&market).await.unwrap();

    let order: Vec<_> = composite
        .quotes
        .iter()
        .map(|q| q.aggregator.as_str())
        .collect();
    assert_eq!(order, ["odos", "kyberswap"]);
    assert_eq!(composite.best().unwrap().usd_value, Some(dec!(103)));
    assert!(composite.failures.is_empty());
}

#[tokio::test]
async fn partial_failure_still_produces_a_composite() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(99)));
    h.quotes
        .aggregator_fails("odos", QuoteError::RateLimited);

    let composite = h.orchestrator.quote(&market).await.unwrap();

    assert_eq!(composite.quotes.len(), 1);
    assert_eq!(composite.best().unwrap().aggregator, "kyberswap");
    assert_eq!(composite.failures.len(), 1);
    assert_eq!(composite.failures[0].aggregator, "odos");
}

#[tokio::test]
async fn all_aggregators_failing_is_an_error() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_fails("kyberswap", QuoteError::NoLiquidity("dry".to_string()));
    h.quotes
        .aggregator_fails("odos", QuoteError::NoLiquidity("dry".to_string()));

    let err = h.orchestrator.quote(&market).await.unwrap_err();
    assert!(matches!(err, Error::AllAggregatorsFailed { .. }));
}

#[tokio::test]
async fn missing_price_degrades_usd_to_unavailable() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.prices.set_price(None);
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(103)));
    h.quotes
        .aggregator_returns("odos", domain::raw_quote("odos", yt_units(101)));

    let composite = h.orchestrator.quote(&market).await.unwrap();

    assert_eq!(composite.quotes.len(), 2);
    assert!(composite.quotes.iter().all(|q| q.usd_value.is_none()));
    // Without USD values the tie breaks by aggregator name; amounts survive.
    assert_eq!(composite.best().unwrap().aggregator, "kyberswap");
    assert_eq!(composite.best().unwrap().amount, dec!(103));
}

#[tokio::test]
async fn unconfigured_chain_is_rejected() {
    let h = harness();
    let market = domain::market(999, "0xaa");

    let err = h.orchestrator.quote(&market).await.unwrap_err();
    assert!(matches!(err, Error::UnknownChain(999)));
}

#[tokio::test]
async fn market_without_yield_token_is_rejected() {
    let h = harness();
    let mut market = domain::market(1, "0xaa");
    market.yt_address = None;

    let err = h.orchestrator.quote(&market).await.unwrap_err();
    assert!(matches!(err, Error::UnknownMarket { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduler_pass_skips_while_a_quote_is_in_flight() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(101)));
    h.quotes
        .aggregator_returns("odos", domain::raw_quote("odos", yt_units(101)));
    h.quotes.set_delay(Duration::from_millis(300));

    let orchestrator = Arc::clone(&h.orchestrator);
    let slow_market = market.clone();
    let in_flight = tokio::spawn(async move { orchestrator.quote(&slow_market).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The overlapping scheduler pass skips instead of doubling the calls.
    let skipped = h.orchestrator.try_quote(&market).await.unwrap();
    assert!(skipped.is_none());

    let composite = in_flight.await.unwrap().unwrap();
    assert_eq!(composite.quotes.len(), 2);
    // One call per aggregator; the skipped pass contributed none.
    assert_eq!(h.quotes.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_trigger_waits_for_the_in_flight_pass() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(101)));
    h.quotes
        .aggregator_returns("odos", domain::raw_quote("odos", yt_units(101)));
    h.quotes.set_delay(Duration::from_millis(200));

    let orchestrator = Arc::clone(&h.orchestrator);
    let first_market = market.clone();
    let first = tokio::spawn(async move { orchestrator.quote(&first_market).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Waits for the first pass, then runs its own: four calls total.
    let second = h.orchestrator.quote(&market).await.unwrap();
    assert_eq!(second.quotes.len(), 2);
    first.await.unwrap().unwrap();
    assert_eq!(h.quotes.calls(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn market_lock_covers_the_commit_step() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(101)));
    h.quotes
        .aggregator_returns("odos", domain::raw_quote("odos", yt_units(101)));

    let (entered_tx, entered_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    let orchestrator = Arc::clone(&h.orchestrator);
    let committing = market.clone();
    let held = tokio::spawn(async move {
        orchestrator
            .quote_then(&committing, move |_| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                Ok(())
            })
            .await
    });

    // The quote itself is done and the commit step is mid-flight; an
    // overlapping scheduler pass must still see the market as busy.
    entered_rx.recv().unwrap();
    assert!(h.orchestrator.try_quote(&market).await.unwrap().is_none());

    release_tx.send(()).unwrap();
    held.await.unwrap().unwrap();
    assert!(h.orchestrator.try_quote(&market).await.unwrap().is_some());
}

#[tokio::test]
async fn three_way_spread_picks_the_profitable_route() {
    let mut config = domain::test_config();
    config.chains[0].aggregators.push("okx".to_string());
    let config = Arc::new(config);

    let quotes = Arc::new(pendlewatch::testkit::providers::ScriptedQuotes::new());
    quotes.aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(101)));
    quotes.aggregator_returns("odos", domain::raw_quote("odos", yt_units(103)));
    quotes.aggregator_returns("okx", domain::raw_quote("okx", yt_units(99)));
    let prices = Arc::new(pendlewatch::testkit::providers::StaticPrices::with_price(1.0));

    let orchestrator = QuoteOrchestrator::new(config, quotes, prices);
    let composite = orchestrator.quote(&domain::market(1, "0xaa")).await.unwrap();

    let best = composite.best().unwrap();
    assert_eq!(best.aggregator, "odos");
    assert_eq!(best.usd_value, Some(dec!(103)));
    assert_eq!(composite.quotes.len(), 3);
}

#[tokio::test]
async fn quote_timeout_surfaces_as_a_failure() {
    let h = harness();
    let market = h.add_market("0xaa");
    h.quotes
        .aggregator_returns("kyberswap", domain::raw_quote("kyberswap", yt_units(101)));
    h.quotes
        .aggregator_returns("odos", domain::raw_quote("odos", yt_units(102)));
    // Test config allows 1s per quote.
    h.quotes.set_delay(Duration::from_millis(1500));

    let err = h.orchestrator.quote(&market).await.unwrap_err();
    assert!(matches!(err, Error::AllAggregatorsFailed { .. }));
}
