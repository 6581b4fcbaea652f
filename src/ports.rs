//! Ports consumed by the engine: quoting, pricing, catalog and wallet
//! activity. The Pendle REST clients implement them; the testkit provides
//! scripted fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::MarketSummary;
use crate::error::{QuoteError, Result};

/// One swap-quote request: a fixed stablecoin amount into a yield token via a
/// single named aggregator.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub chain_id: u64,
    /// Input token (the chain's reference stablecoin).
    pub token_in: String,
    /// Output token (the market's yield token).
    pub token_out: String,
    /// Input amount in the stablecoin's base units.
    pub amount_in: u128,
    pub aggregator: String,
}

/// An aggregator's raw reply before normalization.
#[derive(Debug, Clone)]
pub struct RawQuote {
    pub aggregator: String,
    /// Output amount in the yield token's base units.
    pub amount_out: u128,
    pub effective_apy: Option<f64>,
    pub implied_apy: Option<f64>,
    pub price_impact: Option<f64>,
}

/// Fetches one swap quote from one aggregator. Calls are independent: a
/// failure is returned typed, never retried here, and never allowed to block
/// sibling aggregators.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> std::result::Result<RawQuote, QuoteError>;
}

/// USD pricing for yield tokens.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price of the asset `"{chain}-{address}"`, `None` when the price
    /// API has no entry for it.
    async fn usd_price(
        &self,
        chain_id: u64,
        address: &str,
    ) -> std::result::Result<Option<f64>, QuoteError>;
}

/// Upstream project catalog.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All non-expired markets, optionally restricted to one chain.
    async fn market_catalog(&self, chain: Option<u64>) -> Result<Vec<MarketSummary>>;
}

/// Action of a wallet transaction as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAction {
    BuyYt,
    SellYt,
    BuyYtLimitOrder,
    SellYtLimitOrder,
    RedeemYtYield,
}

impl TxAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "buyYt" => Some(TxAction::BuyYt),
            "sellYt" => Some(TxAction::SellYt),
            "buyYtLimitOrder" => Some(TxAction::BuyYtLimitOrder),
            "sellYtLimitOrder" => Some(TxAction::SellYtLimitOrder),
            "redeemYtYield" => Some(TxAction::RedeemYtYield),
            _ => None,
        }
    }
}

/// One wallet transaction within the lookback window.
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    pub tx_hash: String,
    pub chain_id: u64,
    pub market_address: String,
    pub action: TxAction,
    pub timestamp: DateTime<Utc>,
    /// Transaction value in the accounting asset (USD terms).
    pub value_usd: f64,
    /// YT and PT prices in the accounting asset at trade time, used to derive
    /// the implied yield.
    pub yt_price: Option<f64>,
    pub pt_price: Option<f64>,
    /// Realized profit in USD; present on sells and redemptions.
    pub profit_usd: Option<f64>,
}

/// Status of a limit order as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Fillable,
    Cancelled,
    Expired,
    FullyFilled,
    EmptyMakerBalance,
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FILLABLE" => Some(OrderStatus::Fillable),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "EXPIRED" => Some(OrderStatus::Expired),
            "FULLY_FILLED" => Some(OrderStatus::FullyFilled),
            "EMPTY_MAKER_BALANCE" => Some(OrderStatus::EmptyMakerBalance),
            _ => None,
        }
    }
}

/// Direction of a limit order: long yield buys YT, short yield sells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    LongYield,
    ShortYield,
}

/// One limit order touched within the lookback window.
#[derive(Debug, Clone)]
pub struct WalletLimitOrder {
    pub order_id: String,
    pub chain_id: u64,
    pub market_address: Option<String>,
    pub status: OrderStatus,
    pub side: OrderSide,
    pub notional_usd: Option<f64>,
    /// Raw `lnImpliedRate` (1e18 fixed point) for the implied-yield
    /// derivation.
    pub ln_implied_rate: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Wallet activity feed: recent transactions and limit orders.
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    async fn transactions(&self, wallet: &str, limit: usize) -> Result<Vec<WalletTransaction>>;

    /// Limit orders for the wallet on one chain whose latest event falls
    /// within `window_hours`.
    async fn limit_orders(
        &self,
        wallet: &str,
        chain_id: u64,
        window_hours: u64,
    ) -> Result<Vec<WalletLimitOrder>>;
}

// Keep the trait objects usable through smart pointers.
#[async_trait]
impl<T: QuoteProvider + ?Sized> QuoteProvider for std::sync::Arc<T> {
    async fn quote(&self, request: &QuoteRequest) -> std::result::Result<RawQuote, QuoteError> {
        (**self).quote(request).await
    }
}
