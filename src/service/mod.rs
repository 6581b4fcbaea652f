//! Cross-cutting services: event notifications.

#[cfg(feature = "telegram")]
mod telegram;

#[cfg(feature = "telegram")]
pub use telegram::{TelegramConfig, TelegramNotifier};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{MarketId, Operation, WalletTier};

/// Events that can trigger notifications.
///
/// Delivery is best-effort: detector and differ state is committed before
/// notifiers run, and a failed delivery is logged, never rolled back into
/// state.
#[derive(Debug, Clone)]
pub enum Event {
    /// Best quote crossed the opportunity threshold from below.
    HighValueOpportunity(OpportunityEvent),
    /// Best quote crossed the large-order size threshold from below.
    LargeOrder(LargeOrderEvent),
    /// Implied APY moved at least the configured delta from the baseline.
    AprChange(AprChangeEvent),
    /// A tracked wallet performed a new operation.
    WalletOperation(WalletOperationEvent),
    /// A catalog sync finished.
    CatalogSynced(CatalogEvent),
}

#[derive(Debug, Clone)]
pub struct OpportunityEvent {
    pub market: MarketId,
    pub market_name: String,
    /// Chain display name, used for the market deep link.
    pub chain_name: Option<String>,
    pub aggregator: String,
    pub usd_value: Decimal,
    pub notional: Decimal,
    pub effective_apy: Option<f64>,
    pub implied_apy: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct LargeOrderEvent {
    pub market: MarketId,
    pub market_name: String,
    pub chain_name: Option<String>,
    pub aggregator: String,
    pub usd_value: Decimal,
    pub threshold: Decimal,
}

#[derive(Debug, Clone)]
pub struct AprChangeEvent {
    pub market: MarketId,
    pub market_name: String,
    pub chain_name: Option<String>,
    /// Baseline implied APY, percentage points.
    pub previous: f64,
    pub current: f64,
}

impl AprChangeEvent {
    pub fn delta(&self) -> f64 {
        self.current - self.previous
    }
}

#[derive(Debug, Clone)]
pub struct WalletOperationEvent {
    pub wallet_address: String,
    pub wallet_name: String,
    pub tier: WalletTier,
    pub chain_name: Option<String>,
    pub operation: Operation,
}

#[derive(Debug, Clone)]
pub struct CatalogEvent {
    pub date: NaiveDate,
    pub total: usize,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Trait for notification handlers.
///
/// `notify` must return quickly; slow backends hand the event to a worker
/// task instead of blocking the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Registry of notifiers. Every event fans out to all of them.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// Logs events via tracing with structured fields.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match event {
            Event::HighValueOpportunity(e) => {
                info!(
                    market = %e.market,
                    name = %e.market_name,
                    aggregator = %e.aggregator,
                    usd_value = %e.usd_value,
                    "High-value opportunity"
                );
            }
            Event::LargeOrder(e) => {
                info!(
                    market = %e.market,
                    aggregator = %e.aggregator,
                    usd_value = %e.usd_value,
                    threshold = %e.threshold,
                    "Large order"
                );
            }
            Event::AprChange(e) => {
                info!(
                    market = %e.market,
                    previous = e.previous,
                    current = e.current,
                    delta = e.delta(),
                    "Implied APY change"
                );
            }
            Event::WalletOperation(e) => {
                info!(
                    wallet = %e.wallet_name,
                    tier = e.tier.label(),
                    kind = e.operation.kind.label(),
                    market = %e.operation.market_label,
                    "Wallet operation"
                );
            }
            Event::CatalogSynced(e) => {
                info!(
                    date = %e.date,
                    total = e.total,
                    added = e.added.len(),
                    removed = e.removed.len(),
                    "Catalog synced"
                );
            }
        }
    }
}
