use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;
use crate::ports::{
    ActivityProvider, OrderSide, OrderStatus, TxAction, WalletLimitOrder, WalletTransaction,
};

use super::messages::{LimitOrderEntry, LimitOrdersResponse, TransactionEntry, TransactionsResponse};

const PAGE_SIZE: usize = 100;
/// Upper bound on limit-order pages per wallet, the feed is ordered oldest
/// first so a deep wallet could otherwise paginate forever.
const MAX_PAGES: usize = 20;

/// Wallet activity client: pnl transactions and maker limit orders.
pub struct ActivityClient {
    client: Client,
    base_url: String,
}

impl ActivityClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

fn transaction(entry: TransactionEntry) -> Option<WalletTransaction> {
    let action = TxAction::parse(entry.action.as_deref()?)?;
    let tx_hash = entry.tx_hash?;
    let timestamp = entry.timestamp?;
    let market_address = entry.market?.to_lowercase();
    let chain_id = entry.chain_id?;
    Some(WalletTransaction {
        tx_hash,
        chain_id,
        market_address,
        action,
        timestamp,
        value_usd: entry.tx_value_asset.unwrap_or(0.0),
        yt_price: entry.price_in_asset.as_ref().and_then(|p| p.yt),
        pt_price: entry.price_in_asset.as_ref().and_then(|p| p.pt),
        profit_usd: entry.profit.and_then(|p| p.usd),
    })
}

fn limit_order(entry: LimitOrderEntry) -> Option<WalletLimitOrder> {
    let order_id = entry.id?;
    let status = OrderStatus::parse(entry.status.as_deref()?)?;
    let timestamp = entry.latest_event_timestamp.or(entry.created_at)?;
    let state = entry.order_state;
    let side = match state.as_ref().and_then(|s| s.order_type.as_deref()) {
        Some("LONG_YIELD") => OrderSide::LongYield,
        Some("SHORT_YIELD") => OrderSide::ShortYield,
        _ => return None,
    };
    Some(WalletLimitOrder {
        order_id,
        chain_id: entry.chain_id.unwrap_or_default(),
        market_address: entry.yt.map(|yt| yt.to_lowercase()),
        status,
        side,
        notional_usd: state.and_then(|s| s.notional_volume_usd),
        ln_implied_rate: entry.ln_implied_rate,
        timestamp,
    })
}

#[async_trait]
impl ActivityProvider for ActivityClient {
    async fn transactions(&self, wallet: &str, limit: usize) -> Result<Vec<WalletTransaction>> {
        let url = format!("{}/core/v1/pnl/transactions", self.base_url);

        let response: TransactionsResponse = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string().as_str()), ("user", wallet)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total = response.results.len();
        let transactions: Vec<_> = response.results.into_iter().filter_map(transaction).collect();
        if transactions.len() < total {
            debug!(
                wallet,
                skipped = total - transactions.len(),
                "skipped unrecognized transactions"
            );
        }
        Ok(transactions)
    }

    /// The maker feed is ordered oldest first, so pages are walked with an
    /// increasing skip until the window is crossed or the feed ends.
    async fn limit_orders(
        &self,
        wallet: &str,
        chain_id: u64,
        window_hours: u64,
    ) -> Result<Vec<WalletLimitOrder>> {
        let url = format!("{}/core/v1/limit-orders/makers/limit-orders", self.base_url);
        let threshold = Utc::now() - Duration::hours(window_hours as i64);

        let mut orders = Vec::new();
        let mut skip = 0usize;
        let mut found_recent = false;

        for _ in 0..MAX_PAGES {
            let response: LimitOrdersResponse = self
                .client
                .get(&url)
                .query(&[
                    ("limit", PAGE_SIZE.to_string().as_str()),
                    ("chainId", &chain_id.to_string()),
                    ("maker", wallet),
                    ("skip", &skip.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let batch_len = response.results.len();
            if batch_len == 0 {
                break;
            }

            let recent: Vec<_> = response
                .results
                .into_iter()
                .filter_map(limit_order)
                .filter(|order| order.timestamp >= threshold)
                .collect();

            if recent.is_empty() {
                if found_recent {
                    // Crossed back out of the window.
                    break;
                }
            } else {
                found_recent = true;
                orders.extend(recent);
            }

            if batch_len < PAGE_SIZE {
                break;
            }
            skip += PAGE_SIZE;
        }

        if skip >= MAX_PAGES * PAGE_SIZE {
            warn!(wallet, chain_id, "limit-order pagination hit the page cap");
        }
        debug!(wallet, chain_id, count = orders.len(), "limit orders in window");
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_action_is_skipped() {
        let entry: TransactionEntry = serde_json::from_value(serde_json::json!({
            "action": "addLiquidity",
            "txHash": "0x1",
            "timestamp": "2026-08-01T00:00:00Z",
            "market": "0xaa",
            "chainId": 1,
        }))
        .unwrap();
        assert!(transaction(entry).is_none());
    }

    #[test]
    fn transaction_maps_prices_and_profit() {
        let entry: TransactionEntry = serde_json::from_value(serde_json::json!({
            "action": "sellYt",
            "txHash": "0x1",
            "timestamp": "2026-08-01T00:00:00Z",
            "market": "0xAA",
            "chainId": 1,
            "txValueAsset": 1234.5,
            "priceInAsset": {"yt": 0.04, "pt": 0.96},
            "profit": {"usd": 17.2},
        }))
        .unwrap();
        let tx = transaction(entry).unwrap();
        assert_eq!(tx.action, TxAction::SellYt);
        assert_eq!(tx.market_address, "0xaa");
        assert_eq!(tx.profit_usd, Some(17.2));
    }

    #[test]
    fn limit_order_requires_known_side() {
        let entry: LimitOrderEntry = serde_json::from_value(serde_json::json!({
            "id": "42",
            "status": "FILLABLE",
            "createdAt": "2026-08-01T00:00:00Z",
            "orderState": {"orderType": "SIDEWAYS"},
        }))
        .unwrap();
        assert!(limit_order(entry).is_none());
    }

    #[test]
    fn limit_order_falls_back_to_created_at() {
        let entry: LimitOrderEntry = serde_json::from_value(serde_json::json!({
            "id": "42",
            "status": "FULLY_FILLED",
            "createdAt": "2026-08-01T00:00:00Z",
            "orderState": {"orderType": "LONG_YIELD", "notionalVolumeUSD": 50000.0},
        }))
        .unwrap();
        let order = limit_order(entry).unwrap();
        assert_eq!(order.status, OrderStatus::FullyFilled);
        assert_eq!(order.side, OrderSide::LongYield);
        assert_eq!(order.notional_usd, Some(50000.0));
    }
}
