use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::domain::{MarketId, MarketSummary};
use crate::error::Result;
use crate::ports::CatalogProvider;

use super::messages::{MarketEntry, MarketsResponse};

/// Market catalog client.
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Details for one market, `None` when upstream does not know it.
    pub async fn market_details(&self, address: &str) -> Result<Option<MarketSummary>> {
        let url = format!("{}/core/v1/markets/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entry: MarketEntry = response.error_for_status()?.json().await?;
        Ok(summarize(entry))
    }
}

/// Maps a catalog entry into a summary. Entries without a chain id cannot be
/// quoted and are dropped.
fn summarize(entry: MarketEntry) -> Option<MarketSummary> {
    let chain_id = entry.chain_id?;
    let details = entry.details;
    // The yt field carries the "{chain}-{address}" asset id.
    let yt_address = entry
        .yt
        .as_deref()
        .map(|yt| yt.rsplit('-').next().unwrap_or(yt).to_lowercase());
    let implied_apy = details
        .as_ref()
        .and_then(|d| d.aggregated_apy.or(d.implied_apy))
        // Fractional form (0.05 for 5%) is normalized to percentage points.
        .map(|apy| if apy.abs() < 1.0 { apy * 100.0 } else { apy });
    Some(MarketSummary {
        id: MarketId::new(chain_id, entry.address),
        name: entry.name.unwrap_or_default(),
        symbol: entry.symbol,
        expiry: entry.expiry,
        yt_address,
        yt_decimals: None,
        group: None,
        tvl: details.as_ref().and_then(|d| d.total_tvl),
        volume_24h: details.as_ref().and_then(|d| d.trading_volume),
        implied_apy,
    })
}

#[async_trait]
impl CatalogProvider for CatalogClient {
    async fn market_catalog(&self, chain: Option<u64>) -> Result<Vec<MarketSummary>> {
        let url = format!("{}/core/v1/markets/all", self.base_url);
        info!(url = %url, "fetching market catalog");

        let response: MarketsResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let now = Utc::now();
        let total = response.markets.len();
        let markets: Vec<_> = response
            .markets
            .into_iter()
            .filter(|entry| matches!(entry.expiry, Some(expiry) if expiry > now))
            .filter_map(summarize)
            .filter(|summary| chain.map_or(true, |id| summary.id.chain_id() == id))
            .collect();
        debug!(total, active = markets.len(), "catalog fetched");

        Ok(markets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yt_asset_id_reduces_to_address() {
        let entry: MarketEntry = serde_json::from_value(serde_json::json!({
            "address": "0xAA",
            "chainId": 1,
            "name": "reUSDe",
            "yt": "1-0x11F20e5268CdB45ef2337a64A4a2Cc12e264FA5a",
        }))
        .unwrap();
        let summary = summarize(entry).unwrap();
        assert_eq!(
            summary.yt_address.as_deref(),
            Some("0x11f20e5268cdb45ef2337a64a4a2cc12e264fa5a")
        );
    }

    #[test]
    fn fractional_apy_becomes_percentage_points() {
        let entry: MarketEntry = serde_json::from_value(serde_json::json!({
            "address": "0xaa",
            "chainId": 1,
            "details": {"impliedApy": 0.0525},
        }))
        .unwrap();
        let summary = summarize(entry).unwrap();
        assert_eq!(summary.implied_apy, Some(5.25));
    }

    #[test]
    fn entry_without_chain_is_dropped() {
        let entry: MarketEntry =
            serde_json::from_value(serde_json::json!({"address": "0xaa"})).unwrap();
        assert!(summarize(entry).is_none());
    }
}
