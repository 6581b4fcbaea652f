//! Storage ports and the in-memory implementation.
//!
//! The traits are the persistence contract; the engine only ever talks to
//! them. [`MemoryStore`] backs both with `parking_lot` maps and is the
//! default engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{
    HistoryEntry, Market, MarketId, MarketState, MarketSummary, Operation, OperationKey, Wallet,
};
use crate::error::Result;

/// Market persistence: the monitored rotation, per-market detection state
/// and catalog history.
pub trait MarketStore: Send + Sync {
    /// Markets currently in the monitoring rotation.
    fn monitored_markets(&self) -> Result<Vec<Market>>;

    fn get_market(&self, id: &MarketId) -> Result<Option<Market>>;

    /// All known market ids, including unmonitored ones.
    fn market_ids(&self) -> Result<Vec<MarketId>>;

    /// Inserts or refreshes a market from a catalog entry. Monitoring flags
    /// and any user-set group survive the refresh.
    fn upsert_market(&self, summary: MarketSummary) -> Result<()>;

    fn set_monitored(&self, id: &MarketId, monitored: bool) -> Result<()>;

    /// Detection state, defaulted for markets never evaluated.
    fn load_state(&self, id: &MarketId) -> Result<MarketState>;

    fn save_state(&self, id: &MarketId, state: MarketState) -> Result<()>;

    fn append_history(&self, entry: HistoryEntry) -> Result<()>;

    fn history(&self) -> Result<Vec<HistoryEntry>>;
}

/// Wallet persistence: the tracked set and the operations already seen.
pub trait WalletStore: Send + Sync {
    fn wallets(&self) -> Result<Vec<Wallet>>;

    fn add_wallet(&self, wallet: Wallet) -> Result<()>;

    /// External ids of operations already recorded for the wallet.
    fn seen_ids(&self, wallet: &str) -> Result<HashSet<String>>;

    /// Whether the wallet has completed at least one sync pass.
    fn has_synced(&self, wallet: &str) -> Result<bool>;

    fn mark_synced(&self, wallet: &str) -> Result<()>;

    /// Records an operation and marks its key as seen.
    fn record_operation(&self, operation: Operation) -> Result<()>;
}

#[derive(Default)]
struct MarketsInner {
    markets: HashMap<MarketId, Market>,
    states: HashMap<MarketId, MarketState>,
    history: Vec<HistoryEntry>,
}

#[derive(Default)]
struct WalletsInner {
    wallets: HashMap<String, Wallet>,
    seen: HashSet<OperationKey>,
    synced: HashSet<String>,
    operations: Vec<Operation>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    markets: RwLock<MarketsInner>,
    wallets: RwLock<WalletsInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Recorded wallet operations, newest last.
    pub fn operations(&self) -> Vec<Operation> {
        self.wallets.read().operations.clone()
    }
}

impl MarketStore for MemoryStore {
    fn monitored_markets(&self) -> Result<Vec<Market>> {
        let inner = self.markets.read();
        let mut markets: Vec<_> = inner
            .markets
            .values()
            .filter(|m| m.monitored)
            .cloned()
            .collect();
        // Deterministic rotation order.
        markets.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));
        Ok(markets)
    }

    fn get_market(&self, id: &MarketId) -> Result<Option<Market>> {
        Ok(self.markets.read().markets.get(id).cloned())
    }

    fn market_ids(&self) -> Result<Vec<MarketId>> {
        Ok(self.markets.read().markets.keys().cloned().collect())
    }

    fn upsert_market(&self, summary: MarketSummary) -> Result<()> {
        let mut inner = self.markets.write();
        let market = inner
            .markets
            .entry(summary.id.clone())
            .or_insert_with(|| Market::new(summary.id.clone(), summary.name.clone()));
        if !summary.name.is_empty() {
            market.name = summary.name;
        }
        market.symbol = summary.symbol.or(market.symbol.take());
        market.expiry = summary.expiry.or(market.expiry);
        market.yt_address = summary.yt_address.or(market.yt_address.take());
        if let Some(decimals) = summary.yt_decimals {
            market.yt_decimals = decimals;
        }
        if market.group.is_none() {
            market.group = summary.group;
        }
        market.tvl = summary.tvl.or(market.tvl);
        market.volume_24h = summary.volume_24h.or(market.volume_24h);
        market.implied_apy = summary.implied_apy.or(market.implied_apy);
        market.updated_at = Utc::now();
        Ok(())
    }

    fn set_monitored(&self, id: &MarketId, monitored: bool) -> Result<()> {
        let mut inner = self.markets.write();
        if let Some(market) = inner.markets.get_mut(id) {
            market.monitored = monitored;
        }
        Ok(())
    }

    fn load_state(&self, id: &MarketId) -> Result<MarketState> {
        Ok(self.markets.read().states.get(id).cloned().unwrap_or_default())
    }

    fn save_state(&self, id: &MarketId, state: MarketState) -> Result<()> {
        self.markets.write().states.insert(id.clone(), state);
        Ok(())
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<()> {
        self.markets.write().history.push(entry);
        Ok(())
    }

    fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.markets.read().history.clone())
    }
}

impl WalletStore for MemoryStore {
    fn wallets(&self) -> Result<Vec<Wallet>> {
        let inner = self.wallets.read();
        let mut wallets: Vec<_> = inner.wallets.values().cloned().collect();
        wallets.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(wallets)
    }

    fn add_wallet(&self, wallet: Wallet) -> Result<()> {
        self.wallets
            .write()
            .wallets
            .insert(wallet.address.clone(), wallet);
        Ok(())
    }

    fn seen_ids(&self, wallet: &str) -> Result<HashSet<String>> {
        let wallet = wallet.to_lowercase();
        Ok(self
            .wallets
            .read()
            .seen
            .iter()
            .filter(|key| key.wallet == wallet)
            .map(|key| key.external_id.clone())
            .collect())
    }

    fn has_synced(&self, wallet: &str) -> Result<bool> {
        Ok(self.wallets.read().synced.contains(&wallet.to_lowercase()))
    }

    fn mark_synced(&self, wallet: &str) -> Result<()> {
        self.wallets.write().synced.insert(wallet.to_lowercase());
        Ok(())
    }

    fn record_operation(&self, operation: Operation) -> Result<()> {
        let mut inner = self.wallets.write();
        inner.seen.insert(operation.key.clone());
        inner.operations.push(operation);
        Ok(())
    }
}
