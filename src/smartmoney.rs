//! Smart-money wallet tracking.
//!
//! Each pass fetches a wallet's recent transactions and limit orders,
//! converts them into operations, diffs against the set already seen and
//! notifies the new ones oldest first. Recording happens before delivery:
//! the store is authoritative, notifications are best-effort.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{
    Market, MarketId, Operation, OperationKey, OperationKind, Wallet,
};
use crate::error::Result;
use crate::ports::{
    ActivityProvider, OrderStatus, TxAction, WalletLimitOrder, WalletTransaction,
};
use crate::service::{Event, NotifierRegistry, WalletOperationEvent};
use crate::store::{MarketStore, WalletStore};

const MINUTES_PER_YEAR: f64 = 525_600.0;
const UNKNOWN_MARKET_LABEL: &str = "unknown market";

/// Walks the tracked wallets and turns fresh on-chain activity into events.
pub struct SmartMoneyUpdater {
    config: Arc<Config>,
    activity: Arc<dyn ActivityProvider>,
    markets: Arc<dyn MarketStore>,
    wallets: Arc<dyn WalletStore>,
    notifiers: Arc<NotifierRegistry>,
}

impl SmartMoneyUpdater {
    pub fn new(
        config: Arc<Config>,
        activity: Arc<dyn ActivityProvider>,
        markets: Arc<dyn MarketStore>,
        wallets: Arc<dyn WalletStore>,
        notifiers: Arc<NotifierRegistry>,
    ) -> Self {
        Self {
            config,
            activity,
            markets,
            wallets,
            notifiers,
        }
    }

    /// One full pass over every tracked wallet. A failing wallet is logged
    /// and skipped; it never aborts the rest of the pass.
    pub async fn update_all(&self) {
        let wallets = match self.wallets.wallets() {
            Ok(wallets) => wallets,
            Err(err) => {
                warn!(error = %err, "wallet list unavailable");
                return;
            }
        };
        let delay = std::time::Duration::from_secs(self.config.smart_money.wallet_delay_secs);
        for (index, wallet) in wallets.iter().enumerate() {
            match self.update_wallet(wallet).await {
                Ok(notified) if notified > 0 => {
                    info!(wallet = %wallet.display_name(), notified, "wallet updated");
                }
                Ok(_) => debug!(wallet = %wallet.display_name(), "no new activity"),
                Err(err) => {
                    warn!(wallet = %wallet.display_name(), error = %err, "wallet update failed");
                }
            }
            if index + 1 < wallets.len() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Updates one wallet. Returns how many operations were notified.
    pub async fn update_wallet(&self, wallet: &Wallet) -> Result<usize> {
        let lookback = self.config.smart_money.lookback_hours;
        let cutoff = Utc::now() - Duration::hours(lookback as i64);

        let mut operations: Vec<Operation> = Vec::new();

        let transactions = self.activity.transactions(&wallet.address, 100).await?;
        for tx in transactions {
            if tx.timestamp < cutoff {
                continue;
            }
            operations.push(self.transaction_operation(wallet, &tx)?);
        }

        for chain in &self.config.chains {
            match self
                .activity
                .limit_orders(&wallet.address, chain.id, lookback)
                .await
            {
                Ok(orders) => {
                    for order in orders {
                        if let Some(op) = self.limit_order_operation(wallet, &order)? {
                            operations.push(op);
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        wallet = %wallet.display_name(),
                        chain = chain.id,
                        error = %err,
                        "limit-order fetch failed"
                    );
                }
            }
        }

        // Diff against what is already recorded, then oldest first so the
        // notification feed reads chronologically.
        let seen = self.wallets.seen_ids(&wallet.address)?;
        let mut fresh: Vec<Operation> = operations
            .into_iter()
            .filter(|op| !seen.contains(&op.key.external_id))
            .collect();
        fresh.sort_by_key(|op| op.timestamp);

        let first_sync = !self.wallets.has_synced(&wallet.address)?;
        let notify_from = if first_sync {
            // Record everything, but notify only the tail to keep a wallet's
            // first sync from flooding the channel.
            fresh
                .len()
                .saturating_sub(self.config.smart_money.first_sync_notify_limit)
        } else {
            0
        };

        let mut notified = 0;
        for (index, operation) in fresh.into_iter().enumerate() {
            let chain_name = operation
                .market
                .as_ref()
                .and_then(|id| self.config.chain(id.chain_id()))
                .map(|c| c.name.clone());
            self.wallets.record_operation(operation.clone())?;
            if index >= notify_from {
                self.notifiers
                    .notify_all(Event::WalletOperation(WalletOperationEvent {
                        wallet_address: wallet.address.clone(),
                        wallet_name: wallet.display_name(),
                        tier: wallet.tier,
                        chain_name,
                        operation,
                    }));
                notified += 1;
            }
        }
        self.wallets.mark_synced(&wallet.address)?;
        Ok(notified)
    }

    fn transaction_operation(&self, wallet: &Wallet, tx: &WalletTransaction) -> Result<Operation> {
        let id = MarketId::new(tx.chain_id, &tx.market_address);
        let market = self.markets.get_market(&id)?;
        let implied_yield = market
            .as_ref()
            .and_then(|m| m.minutes_to_expiry(tx.timestamp))
            .and_then(|minutes| {
                let yt = tx.yt_price?;
                let pt = tx.pt_price?;
                implied_yield_from_prices(yt, pt, minutes)
            });
        let kind = transaction_kind(tx.action);
        Ok(Operation {
            key: OperationKey::new(&wallet.address, &tx.tx_hash),
            kind,
            timestamp: tx.timestamp,
            amount_usd: kind.has_amount().then_some(tx.value_usd),
            implied_yield,
            profit_usd: tx.profit_usd.filter(|_| kind.has_profit()),
            market_label: market
                .as_ref()
                .map(|m| m.name.clone())
                .unwrap_or_else(|| UNKNOWN_MARKET_LABEL.to_string()),
            market: market.map(|m| m.id),
        })
    }

    fn limit_order_operation(
        &self,
        wallet: &Wallet,
        order: &WalletLimitOrder,
    ) -> Result<Option<Operation>> {
        let Some(kind) = limit_order_kind(order.status) else {
            return Ok(None);
        };
        let market = match &order.market_address {
            Some(yt) => self.find_by_yt(order.chain_id, yt)?,
            None => None,
        };
        Ok(Some(Operation {
            key: OperationKey::new(&wallet.address, &order.order_id),
            kind,
            timestamp: order.timestamp,
            amount_usd: order.notional_usd,
            implied_yield: order
                .ln_implied_rate
                .as_deref()
                .and_then(implied_yield_from_ln_rate),
            profit_usd: None,
            market_label: market
                .as_ref()
                .map(|m| m.name.clone())
                .unwrap_or_else(|| UNKNOWN_MARKET_LABEL.to_string()),
            market: market.map(|m| m.id),
        }))
    }

    /// Limit orders identify their market by yield-token address.
    fn find_by_yt(&self, chain_id: u64, yt_address: &str) -> Result<Option<Market>> {
        let yt = yt_address.to_lowercase();
        for id in self.markets.market_ids()? {
            if id.chain_id() != chain_id {
                continue;
            }
            if let Some(market) = self.markets.get_market(&id)? {
                if market.yt_address.as_deref() == Some(yt.as_str()) {
                    return Ok(Some(market));
                }
            }
        }
        Ok(None)
    }
}

fn transaction_kind(action: TxAction) -> OperationKind {
    match action {
        TxAction::BuyYt => OperationKind::MarketBuy,
        TxAction::SellYt => OperationKind::MarketSell,
        TxAction::BuyYtLimitOrder => OperationKind::LimitBuy,
        TxAction::SellYtLimitOrder => OperationKind::LimitSell,
        TxAction::RedeemYtYield => OperationKind::YieldRedemption,
    }
}

fn limit_order_kind(status: OrderStatus) -> Option<OperationKind> {
    match status {
        OrderStatus::Fillable => Some(OperationKind::LimitOrderPlaced),
        OrderStatus::FullyFilled => Some(OperationKind::LimitOrderFilled),
        OrderStatus::Cancelled => Some(OperationKind::LimitOrderCancelled),
        OrderStatus::Expired => Some(OperationKind::LimitOrderExpired),
        // Stale book entries, not wallet intent.
        OrderStatus::EmptyMakerBalance => None,
    }
}

/// Annualized yield implied by a trade's YT/PT price ratio over the market's
/// remaining tenor.
pub fn implied_yield_from_prices(
    yt_price: f64,
    pt_price: f64,
    minutes_to_expiry: i64,
) -> Option<f64> {
    if yt_price <= 0.0 || pt_price <= 0.0 || minutes_to_expiry <= 0 {
        return None;
    }
    let ratio = yt_price / pt_price;
    let annualized = ((1.0 + ratio).powf(MINUTES_PER_YEAR / minutes_to_expiry as f64) - 1.0) * 100.0;
    annualized.is_finite().then_some(annualized)
}

/// Annualized yield from a limit order's `lnImpliedRate` (1e18 fixed point):
/// `e^(ln_rate) - 1`. Rates outside a sane band are upstream noise.
pub fn implied_yield_from_ln_rate(ln_implied_rate: &str) -> Option<f64> {
    let raw: f64 = ln_implied_rate.parse().ok()?;
    let ln_rate = raw / 1e18;
    if !(-10.0..=10.0).contains(&ln_rate) {
        return None;
    }
    let percent = (ln_rate.exp() - 1.0) * 100.0;
    (percent.is_finite() && percent.abs() <= 10_000.0).then_some(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_rate_yield_matches_fixed_point_formula() {
        // 188461005086490266 / 1e18 = 0.18846..., e^x - 1 = 20.74%.
        let apy = implied_yield_from_ln_rate("188461005086490266").unwrap();
        assert!((apy - 20.739).abs() < 0.01);
    }

    #[test]
    fn ln_rate_outside_band_is_rejected() {
        assert_eq!(implied_yield_from_ln_rate("20000000000000000000"), None);
        assert_eq!(implied_yield_from_ln_rate("not a number"), None);
    }

    #[test]
    fn price_ratio_yield_annualizes_over_tenor() {
        // yt/pt = 0.05/0.95, 97832 minutes to expiry.
        let apy = implied_yield_from_prices(0.05, 0.95, 97_832).unwrap();
        let ratio: f64 = 0.05 / 0.95;
        let expected = ((1.0 + ratio).powf(525_600.0 / 97_832.0) - 1.0) * 100.0;
        assert!((apy - expected).abs() < 1e-9);
    }

    #[test]
    fn price_ratio_yield_guards_degenerate_inputs() {
        assert_eq!(implied_yield_from_prices(0.0, 0.95, 1000), None);
        assert_eq!(implied_yield_from_prices(0.05, 0.0, 1000), None);
        assert_eq!(implied_yield_from_prices(0.05, 0.95, 0), None);
    }

    #[test]
    fn empty_maker_balance_orders_are_ignored() {
        assert_eq!(limit_order_kind(OrderStatus::EmptyMakerBalance), None);
        assert_eq!(
            limit_order_kind(OrderStatus::Fillable),
            Some(OperationKind::LimitOrderPlaced)
        );
    }

    #[test]
    fn sells_keep_profit_buys_do_not() {
        assert!(transaction_kind(TxAction::SellYt).has_profit());
        assert!(!transaction_kind(TxAction::BuyYt).has_profit());
        assert!(transaction_kind(TxAction::RedeemYtYield).has_profit());
    }
}
