//! Round-robin price-test cycle.
//!
//! One market is tested at a time with a fixed delay between markets. The
//! monitored list is re-read from the store on an interval; additions join
//! the tail of the rotation and removals splice out without disturbing the
//! order of the survivors.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::detector::{evaluate, DetectorContext};
use crate::domain::{CompositeQuote, Market, MarketId};
use crate::error::{Error, Result};
use crate::quote::QuoteOrchestrator;
use crate::service::NotifierRegistry;
use crate::store::MarketStore;

/// Snapshot of the cycle's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStatus {
    pub running: bool,
    /// Market being processed right now, `None` between items or when idle.
    pub current_market: Option<MarketId>,
    /// Completion time of the most recent item.
    pub last_tick: Option<DateTime<Utc>>,
}

struct Shared {
    running: AtomicBool,
    stopping: AtomicBool,
    stop: Notify,
    current: Mutex<Option<MarketId>>,
    last_tick: Mutex<Option<DateTime<Utc>>>,
}

/// Drives the repeating price-test cycle over the monitored markets.
pub struct CycleScheduler {
    config: Arc<Config>,
    orchestrator: Arc<QuoteOrchestrator>,
    store: Arc<dyn MarketStore>,
    notifiers: Arc<NotifierRegistry>,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CycleScheduler {
    pub fn new(
        config: Arc<Config>,
        orchestrator: Arc<QuoteOrchestrator>,
        store: Arc<dyn MarketStore>,
        notifiers: Arc<NotifierRegistry>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            store,
            notifiers,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                stop: Notify::new(),
                current: Mutex::new(None),
                last_tick: Mutex::new(None),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Starts the cycle loop. A no-op while a loop is already running.
    pub fn start(self: &Arc<Self>) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            warn!("cycle already running, start ignored");
            return;
        }
        self.shared.stopping.store(false, Ordering::SeqCst);
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            scheduler.run_loop().await;
            scheduler.shared.running.store(false, Ordering::SeqCst);
            *scheduler.shared.current.lock() = None;
            info!("cycle stopped");
        });
        *self.handle.lock() = Some(handle);
        info!("cycle started");
    }

    /// Requests a cooperative stop and waits for the loop to finish its
    /// current item. A no-op when idle.
    pub async fn stop(&self) {
        if !self.shared.running.load(Ordering::SeqCst) {
            return;
        }
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.shared.stop.notify_waiters();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "cycle task panicked");
            }
        }
    }

    pub fn status(&self) -> CycleStatus {
        CycleStatus {
            running: self.shared.running.load(Ordering::SeqCst),
            current_market: self.shared.current.lock().clone(),
            last_tick: *self.shared.last_tick.lock(),
        }
    }

    /// Runs one on-demand price test for a single market, waiting for any
    /// in-flight scheduled pass rather than duplicating it. The detector
    /// runs exactly as in the scheduled path, under the same market lock, so
    /// its state commit cannot race a scheduled pass that finished quoting
    /// moments earlier.
    pub async fn trigger_single_quote(&self, id: &MarketId) -> Result<CompositeQuote> {
        let market = self
            .store
            .get_market(id)?
            .ok_or_else(|| Error::UnknownMarket { market: id.clone() })?;
        self.orchestrator
            .quote_then(&market, |composite| self.detect_and_notify(&market, composite))
            .await
    }

    async fn run_loop(&self) {
        let market_delay = Duration::from_secs(self.config.scheduler.market_delay_secs);
        let refresh_interval = Duration::from_secs(self.config.scheduler.refresh_interval_secs);

        let mut rotation: Vec<MarketId> = Vec::new();
        let mut pointer = 0usize;
        let mut last_refresh: Option<tokio::time::Instant> = None;

        loop {
            if self.shared.stopping.load(Ordering::SeqCst) {
                break;
            }

            let due = last_refresh.map_or(true, |t| t.elapsed() >= refresh_interval);
            if due {
                match self.store.monitored_markets() {
                    Ok(markets) => {
                        let fresh: Vec<MarketId> = markets.into_iter().map(|m| m.id).collect();
                        let (merged, clamped) = merge_rotation(&rotation, pointer, &fresh);
                        debug!(markets = merged.len(), "rotation refreshed");
                        rotation = merged;
                        pointer = clamped;
                    }
                    Err(err) => warn!(error = %err, "rotation refresh failed"),
                }
                last_refresh = Some(tokio::time::Instant::now());
            }

            if rotation.is_empty() {
                *self.shared.current.lock() = None;
                if self.sleep_or_stop(refresh_interval).await {
                    break;
                }
                last_refresh = None;
                continue;
            }

            if pointer >= rotation.len() {
                pointer = 0;
            }
            let id = rotation[pointer].clone();
            *self.shared.current.lock() = Some(id.clone());

            if self.process(&id).await {
                pointer += 1;
            } else {
                // Unknown market: splice out and keep the pointer in place
                // so the next market is not skipped.
                rotation.remove(pointer);
            }

            *self.shared.current.lock() = None;
            *self.shared.last_tick.lock() = Some(Utc::now());

            if self.sleep_or_stop(market_delay).await {
                break;
            }
        }
    }

    /// Processes one rotation item. Returns false when the market should
    /// leave the rotation.
    async fn process(&self, id: &MarketId) -> bool {
        let market = match self.store.get_market(id) {
            Ok(Some(market)) => market,
            Ok(None) => {
                warn!(market = %id, "market vanished from store, removing from rotation");
                return false;
            }
            Err(err) => {
                warn!(market = %id, error = %err, "market load failed");
                return true;
            }
        };

        // The detector commits under the market lock; a delivery problem is
        // logged without failing the pass.
        let outcome = self
            .orchestrator
            .try_quote_then(&market, |composite| {
                if let Err(err) = self.detect_and_notify(&market, composite) {
                    warn!(market = %id, error = %err, "detector pass failed");
                }
                Ok(())
            })
            .await;
        match outcome {
            Ok(_) => {}
            Err(Error::UnknownMarket { .. }) | Err(Error::UnknownChain(_)) => {
                warn!(market = %id, "market not quotable, removing from rotation");
                return false;
            }
            Err(Error::AllAggregatorsFailed { .. }) => {
                // State stays untouched; the next lap retries.
                warn!(market = %id, "all aggregators failed");
            }
            Err(err) => {
                warn!(market = %id, error = %err, "price test failed");
            }
        }
        true
    }

    fn detect_and_notify(&self, market: &Market, composite: &CompositeQuote) -> Result<()> {
        let chain_name = self
            .config
            .chain(market.id.chain_id())
            .map(|c| c.name.clone());
        let mut state = self.store.load_state(&market.id)?;
        let events = evaluate(
            composite,
            &DetectorContext {
                market_name: &market.name,
                chain_name: chain_name.as_deref(),
                notional: self.config.pricing.notional,
            },
            &mut state,
            &self.config.detector,
        );
        // State commits before delivery; notification failure never rolls
        // detection back.
        self.store.save_state(&market.id, state)?;
        for event in events {
            self.notifiers.notify_all(event);
        }
        Ok(())
    }

    /// Sleeps for `duration` unless a stop arrives first. Returns true when
    /// the loop should exit.
    async fn sleep_or_stop(&self, duration: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => self.shared.stopping.load(Ordering::SeqCst),
            () = self.shared.stop.notified() => true,
        }
    }
}

/// Merges a fresh monitored list into the current rotation.
///
/// Survivors keep their order, new markets append at the tail, and the
/// pointer moves to the first not-yet-processed survivor so nothing is
/// skipped or processed twice.
fn merge_rotation(
    rotation: &[MarketId],
    pointer: usize,
    fresh: &[MarketId],
) -> (Vec<MarketId>, usize) {
    let fresh_set: HashSet<&MarketId> = fresh.iter().collect();
    let mut merged: Vec<MarketId> = rotation
        .iter()
        .filter(|id| fresh_set.contains(id))
        .cloned()
        .collect();
    let survivors: HashSet<&MarketId> = merged.iter().collect();
    let additions: Vec<MarketId> = fresh
        .iter()
        .filter(|id| !survivors.contains(id))
        .cloned()
        .collect();
    merged.extend(additions);

    let pointer = rotation
        .get(pointer.min(rotation.len())..)
        .unwrap_or_default()
        .iter()
        .find(|id| fresh_set.contains(id))
        .and_then(|id| merged.iter().position(|m| m == id))
        .unwrap_or(0);
    (merged, pointer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(addresses: &[&str]) -> Vec<MarketId> {
        addresses.iter().map(|a| MarketId::new(1, *a)).collect()
    }

    #[test]
    fn removal_of_pointer_target_clamps_to_next_survivor() {
        let rotation = ids(&["0xa", "0xb", "0xc"]);
        // Pointer on 0xb, which the refresh removes.
        let fresh = ids(&["0xa", "0xc"]);
        let (merged, pointer) = merge_rotation(&rotation, 1, &fresh);
        assert_eq!(merged, ids(&["0xa", "0xc"]));
        // Next processed market is 0xc: 0xb's slot neither skips 0xc nor
        // re-processes 0xa.
        assert_eq!(pointer, 1);
    }

    #[test]
    fn new_markets_append_at_tail() {
        let rotation = ids(&["0xa", "0xb"]);
        let fresh = ids(&["0xb", "0xd", "0xa", "0xc"]);
        let (merged, pointer) = merge_rotation(&rotation, 0, &fresh);
        assert_eq!(merged, ids(&["0xa", "0xb", "0xd", "0xc"]));
        assert_eq!(pointer, 0);
    }

    #[test]
    fn pointer_past_all_survivors_wraps_to_start() {
        let rotation = ids(&["0xa", "0xb", "0xc"]);
        let fresh = ids(&["0xa"]);
        let (merged, pointer) = merge_rotation(&rotation, 2, &fresh);
        assert_eq!(merged, ids(&["0xa"]));
        assert_eq!(pointer, 0);
    }

    #[test]
    fn empty_fresh_list_empties_rotation() {
        let rotation = ids(&["0xa"]);
        let (merged, pointer) = merge_rotation(&rotation, 0, &[]);
        assert!(merged.is_empty());
        assert_eq!(pointer, 0);
    }
}
