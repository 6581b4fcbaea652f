//! Scripted port implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::MarketSummary;
use crate::error::{QuoteError, Result};
use crate::ports::{
    ActivityProvider, CatalogProvider, PriceSource, QuoteProvider, QuoteRequest, RawQuote,
    WalletLimitOrder, WalletTransaction,
};
use crate::service::{Event, Notifier};

/// Quote provider that replies per aggregator from a script.
///
/// Each aggregator holds a queue of outcomes; the last one repeats once the
/// queue drains. Unknown aggregators report no liquidity.
#[derive(Default)]
pub struct ScriptedQuotes {
    outcomes: Mutex<HashMap<String, Vec<std::result::Result<RawQuote, QuoteError>>>>,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedQuotes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregator_returns(&self, aggregator: &str, raw: RawQuote) -> &Self {
        self.outcomes
            .lock()
            .entry(aggregator.to_string())
            .or_default()
            .push(Ok(raw));
        self
    }

    pub fn aggregator_fails(&self, aggregator: &str, error: QuoteError) -> &Self {
        self.outcomes
            .lock()
            .entry(aggregator.to_string())
            .or_default()
            .push(Err(error));
        self
    }

    /// Adds latency to every reply, for overlap tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Total calls served across all aggregators.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for ScriptedQuotes {
    async fn quote(&self, request: &QuoteRequest) -> std::result::Result<RawQuote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut outcomes = self.outcomes.lock();
        match outcomes.get_mut(&request.aggregator) {
            Some(queue) if !queue.is_empty() => {
                if queue.len() > 1 {
                    queue.remove(0)
                } else {
                    queue[0].clone()
                }
            }
            _ => Err(QuoteError::NoLiquidity(format!(
                "no script for {}",
                request.aggregator
            ))),
        }
    }
}

/// Price source returning one fixed price for every asset.
#[derive(Default)]
pub struct StaticPrices {
    price: Mutex<Option<f64>>,
}

impl StaticPrices {
    #[must_use]
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Mutex::new(Some(price)),
        }
    }

    pub fn set_price(&self, price: Option<f64>) {
        *self.price.lock() = price;
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn usd_price(
        &self,
        _chain_id: u64,
        _address: &str,
    ) -> std::result::Result<Option<f64>, QuoteError> {
        Ok(*self.price.lock())
    }
}

/// Catalog provider serving a fixed market list.
#[derive(Default)]
pub struct ScriptedCatalog {
    markets: Mutex<Vec<MarketSummary>>,
}

impl ScriptedCatalog {
    #[must_use]
    pub fn with_markets(markets: Vec<MarketSummary>) -> Self {
        Self {
            markets: Mutex::new(markets),
        }
    }

    pub fn set_markets(&self, markets: Vec<MarketSummary>) {
        *self.markets.lock() = markets;
    }
}

#[async_trait]
impl CatalogProvider for ScriptedCatalog {
    async fn market_catalog(&self, chain: Option<u64>) -> Result<Vec<MarketSummary>> {
        Ok(self
            .markets
            .lock()
            .iter()
            .filter(|m| chain.map_or(true, |id| m.id.chain_id() == id))
            .cloned()
            .collect())
    }
}

/// Activity provider serving fixed transaction and order lists.
#[derive(Default)]
pub struct ScriptedActivity {
    transactions: Mutex<Vec<WalletTransaction>>,
    orders: Mutex<Vec<WalletLimitOrder>>,
}

impl ScriptedActivity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_transaction(&self, tx: WalletTransaction) {
        self.transactions.lock().push(tx);
    }

    pub fn push_order(&self, order: WalletLimitOrder) {
        self.orders.lock().push(order);
    }
}

#[async_trait]
impl ActivityProvider for ScriptedActivity {
    async fn transactions(&self, _wallet: &str, limit: usize) -> Result<Vec<WalletTransaction>> {
        Ok(self.transactions.lock().iter().take(limit).cloned().collect())
    }

    async fn limit_orders(
        &self,
        _wallet: &str,
        chain_id: u64,
        _window_hours: u64,
    ) -> Result<Vec<WalletLimitOrder>> {
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| o.chain_id == chain_id)
            .cloned()
            .collect())
    }
}

/// Notifier that records every event for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: std::sync::Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that stays valid after the notifier moves into a registry.
    #[must_use]
    pub fn events_handle(&self) -> std::sync::Arc<Mutex<Vec<Event>>> {
        std::sync::Arc::clone(&self.events)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}
