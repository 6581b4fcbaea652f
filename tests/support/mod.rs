#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use pendlewatch::config::Config;
use pendlewatch::domain::Market;
use pendlewatch::quote::QuoteOrchestrator;
use pendlewatch::service::{Event, NotifierRegistry};
use pendlewatch::store::{MarketStore, MemoryStore};
use pendlewatch::testkit::domain;
use pendlewatch::testkit::providers::{RecordingNotifier, ScriptedQuotes, StaticPrices};

/// Everything an orchestration or scheduling test needs, wired together the
/// way the application does it.
pub struct Harness {
    pub config: Arc<Config>,
    pub store: Arc<MemoryStore>,
    pub quotes: Arc<ScriptedQuotes>,
    pub prices: Arc<StaticPrices>,
    pub orchestrator: Arc<QuoteOrchestrator>,
    pub notifiers: Arc<NotifierRegistry>,
    pub events: Arc<Mutex<Vec<Event>>>,
}

/// Builds a harness with a 1 USD yield-token price so USD values equal the
/// decimal-adjusted output amounts.
pub fn harness() -> Harness {
    let config = Arc::new(domain::test_config());
    let store = MemoryStore::new();
    let quotes = Arc::new(ScriptedQuotes::new());
    let prices = Arc::new(StaticPrices::with_price(1.0));
    let orchestrator = Arc::new(QuoteOrchestrator::new(
        Arc::clone(&config),
        quotes.clone(),
        prices.clone(),
    ));

    let recorder = RecordingNotifier::new();
    let events = recorder.events_handle();
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(recorder));

    Harness {
        config,
        store,
        quotes,
        prices,
        orchestrator,
        notifiers: Arc::new(registry),
        events,
    }
}

impl Harness {
    /// Stores a monitored market on chain 1 and returns it.
    pub fn add_market(&self, address: &str) -> Market {
        let market = domain::market(1, address);
        self.store.upsert_market(domain::summary(1, address)).unwrap();
        self.store.set_monitored(&market.id, true).unwrap();
        self.store.get_market(&market.id).unwrap().unwrap()
    }
}

/// Output amount in yield-token base units (18 decimals) worth `units` whole
/// tokens, which at the harness price of 1 USD is also the USD value.
pub fn yt_units(units: u128) -> u128 {
    units * 10u128.pow(18)
}
