use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MarketId;

/// Importance tier of a tracked wallet. Ordering is significance:
/// `Focus > Smart > Ant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTier {
    Ant,
    Smart,
    Focus,
}

impl WalletTier {
    pub fn label(&self) -> &'static str {
        match self {
            WalletTier::Focus => "focus",
            WalletTier::Smart => "smart money",
            WalletTier::Ant => "ant",
        }
    }
}

/// A curated wallet whose on-chain Pendle activity is tracked for signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub name: Option<String>,
    pub tier: WalletTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(address: impl Into<String>, tier: WalletTier) -> Self {
        let now = Utc::now();
        Self {
            address: address.into().to_lowercase(),
            name: None,
            tier,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display name for notifications: the configured name, or a shortened
    /// address.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.address.chars().take(8).collect(),
        }
    }
}

/// What a tracked wallet did on a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    MarketBuy,
    MarketSell,
    LimitBuy,
    LimitSell,
    LimitOrderPlaced,
    LimitOrderFilled,
    LimitOrderCancelled,
    LimitOrderExpired,
    YieldRedemption,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::MarketBuy => "market buy",
            OperationKind::MarketSell => "market sell",
            OperationKind::LimitBuy => "limit buy",
            OperationKind::LimitSell => "limit sell",
            OperationKind::LimitOrderPlaced => "limit order placed",
            OperationKind::LimitOrderFilled => "limit order filled",
            OperationKind::LimitOrderCancelled => "limit order cancelled",
            OperationKind::LimitOrderExpired => "limit order expired",
            OperationKind::YieldRedemption => "yield redemption",
        }
    }

    /// Trade-like operations carry a notional amount worth rendering.
    pub fn has_amount(&self) -> bool {
        !matches!(self, OperationKind::YieldRedemption)
    }

    /// Operations that close or realize a position report profit.
    pub fn has_profit(&self) -> bool {
        matches!(
            self,
            OperationKind::MarketSell | OperationKind::LimitSell | OperationKind::YieldRedemption
        )
    }
}

/// Uniqueness key of an operation: (wallet, external transaction/order id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    pub wallet: String,
    pub external_id: String,
}

impl OperationKey {
    pub fn new(wallet: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            wallet: wallet.into().to_lowercase(),
            external_id: external_id.into(),
        }
    }
}

/// One recorded wallet operation. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub key: OperationKey,
    pub kind: OperationKind,
    pub timestamp: DateTime<Utc>,
    /// Notional amount in USD, when the operation has one.
    pub amount_usd: Option<f64>,
    /// Annualized implied yield at the time of the operation, percentage
    /// points.
    pub implied_yield: Option<f64>,
    /// Realized profit in USD; only sells and redemptions report it.
    pub profit_usd: Option<f64>,
    /// Source market, when it resolves against the catalog.
    pub market: Option<MarketId>,
    /// Market display label; falls back to a placeholder when the market is
    /// unknown so the operation is still rendered, not dropped.
    pub market_label: String,
}
