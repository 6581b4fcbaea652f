//! Catalog synchronization: pulls the upstream market list, refreshes the
//! store and records daily churn.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::HistoryEntry;
use crate::error::Result;
use crate::ports::CatalogProvider;
use crate::service::{CatalogEvent, Event, NotifierRegistry};
use crate::store::MarketStore;

/// Periodic catalog sync job.
pub struct CatalogSync {
    config: Arc<Config>,
    provider: Arc<dyn CatalogProvider>,
    store: Arc<dyn MarketStore>,
    notifiers: Arc<NotifierRegistry>,
    /// Market ids seen on the previous sync, the baseline for churn. Seeded
    /// from the store on the first pass so a restart does not report the
    /// whole catalog as new.
    snapshot: Mutex<Option<HashSet<String>>>,
}

impl CatalogSync {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn CatalogProvider>,
        store: Arc<dyn MarketStore>,
        notifiers: Arc<NotifierRegistry>,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            notifiers,
            snapshot: Mutex::new(None),
        }
    }

    /// One sync pass. Upserts every active market above the volume floor,
    /// un-monitors markets that left the catalog and appends a history entry
    /// for the day's churn.
    pub async fn sync(&self) -> Result<HistoryEntry> {
        let min_volume = self.config.scheduler.min_volume_24h;
        let catalog = self.provider.market_catalog(None).await?;

        let markets: Vec<_> = catalog
            .into_iter()
            .filter(|summary| {
                min_volume <= 0.0 || summary.volume_24h.map_or(false, |v| v >= min_volume)
            })
            .collect();

        let current: HashSet<String> = markets.iter().map(|m| m.id.to_string()).collect();
        let total = markets.len();

        let previous = {
            let mut snapshot = self.snapshot.lock();
            snapshot.take().map(Ok).unwrap_or_else(|| {
                self.store
                    .market_ids()
                    .map(|ids| ids.iter().map(ToString::to_string).collect())
            })?
        };

        let mut added: Vec<String> = current.difference(&previous).cloned().collect();
        let mut removed: Vec<String> = previous.difference(&current).cloned().collect();
        added.sort();
        removed.sort();

        for summary in markets {
            self.store.upsert_market(summary)?;
        }
        // Departed markets are retired from the rotation, never deleted;
        // history keeps referencing them.
        for id_str in &removed {
            if let Some(id) = parse_market_id(id_str) {
                if let Err(err) = self.store.set_monitored(&id, false) {
                    warn!(market = %id, error = %err, "failed to retire market");
                }
            }
        }

        *self.snapshot.lock() = Some(current);

        let entry = HistoryEntry::new(Utc::now().date_naive(), added, removed);
        if !entry.is_empty() {
            self.store.append_history(entry.clone())?;
        }

        info!(
            total,
            added = entry.added.len(),
            removed = entry.removed.len(),
            "catalog synced"
        );
        self.notifiers.notify_all(Event::CatalogSynced(CatalogEvent {
            date: entry.date,
            total,
            added: entry.added.clone(),
            removed: entry.removed.clone(),
        }));
        Ok(entry)
    }
}

fn parse_market_id(id: &str) -> Option<crate::domain::MarketId> {
    let (chain, address) = id.split_once('-')?;
    Some(crate::domain::MarketId::new(chain.parse().ok()?, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_id_round_trips_through_string_form() {
        let id = crate::domain::MarketId::new(42161, "0xAB");
        let parsed = parse_market_id(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_ids_parse_to_none() {
        assert!(parse_market_id("nodash").is_none());
        assert!(parse_market_id("x-0xab").is_none());
    }
}
