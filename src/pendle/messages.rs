//! Wire types for the Pendle v2 REST API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

// GET /core/v2/sdk/{chain}/convert

#[derive(Debug, Deserialize)]
pub struct ConvertResponse {
    #[serde(default)]
    pub routes: Vec<ConvertRoute>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRoute {
    #[serde(default)]
    pub outputs: Vec<ConvertOutput>,
    #[serde(default)]
    pub data: RouteData,
}

#[derive(Debug, Deserialize)]
pub struct ConvertOutput {
    /// Output amount in the token's base units, stringified integer.
    pub amount: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    pub aggregator_type: Option<String>,
    pub effective_apy: Option<f64>,
    pub implied_apy: Option<ImpliedApy>,
    pub price_impact: Option<f64>,
}

/// Implied APY before and after the simulated trade.
#[derive(Debug, Deserialize)]
pub struct ImpliedApy {
    pub after: Option<f64>,
}

// GET /core/v1/markets/all

#[derive(Debug, Deserialize)]
pub struct MarketsResponse {
    #[serde(default)]
    pub markets: Vec<MarketEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEntry {
    pub address: String,
    pub chain_id: Option<u64>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    /// Yield-token asset id in `"{chain}-{address}"` form.
    pub yt: Option<String>,
    pub details: Option<MarketDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDetails {
    pub total_tvl: Option<f64>,
    pub trading_volume: Option<f64>,
    pub implied_apy: Option<f64>,
    /// Aggregated APY, preferred over the plain implied APY when present.
    pub aggregated_apy: Option<f64>,
}

// GET /core/v1/prices/assets

#[derive(Debug, Deserialize)]
pub struct AssetPricesResponse {
    /// USD prices keyed by `"{chain}-{address}"`.
    #[serde(default)]
    pub prices: HashMap<String, f64>,
}

// GET /core/v1/pnl/transactions

#[derive(Debug, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub results: Vec<TransactionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub action: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub market: Option<String>,
    pub chain_id: Option<u64>,
    pub tx_hash: Option<String>,
    /// Transaction value in the accounting asset.
    pub tx_value_asset: Option<f64>,
    pub price_in_asset: Option<PriceInAsset>,
    pub profit: Option<TransactionProfit>,
}

#[derive(Debug, Deserialize)]
pub struct PriceInAsset {
    pub yt: Option<f64>,
    pub pt: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionProfit {
    pub usd: Option<f64>,
}

// GET /core/v1/limit-orders/makers/limit-orders

#[derive(Debug, Deserialize)]
pub struct LimitOrdersResponse {
    #[serde(default)]
    pub results: Vec<LimitOrderEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderEntry {
    pub id: Option<String>,
    pub chain_id: Option<u64>,
    pub status: Option<String>,
    pub order_state: Option<OrderState>,
    /// 1e18 fixed-point natural log of the implied rate.
    pub ln_implied_rate: Option<String>,
    /// Timestamp of the latest order event; falls back to creation time.
    pub latest_event_timestamp: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    /// Yield-token address the order trades against.
    pub yt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    pub order_type: Option<String>,
    #[serde(rename = "notionalVolumeUSD")]
    pub notional_volume_usd: Option<f64>,
}
