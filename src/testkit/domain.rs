//! Builders for domain values and a canonical test configuration.

use chrono::{Duration, Utc};

use crate::config::Config;
use crate::domain::{Market, MarketId, MarketSummary, Wallet, WalletTier};
use crate::ports::{OrderSide, OrderStatus, RawQuote, TxAction, WalletLimitOrder, WalletTransaction};

/// A monitored market on chain 1 with a yield token and a far expiry.
#[must_use]
pub fn market(chain_id: u64, address: &str) -> Market {
    let mut market = Market::new(MarketId::new(chain_id, address), format!("market {address}"));
    market.yt_address = Some(format!("0xyt{}", address.trim_start_matches("0x")));
    market.expiry = Some(Utc::now() + Duration::days(180));
    market.monitored = true;
    market
}

#[must_use]
pub fn summary(chain_id: u64, address: &str) -> MarketSummary {
    let market = market(chain_id, address);
    MarketSummary {
        id: market.id,
        name: market.name,
        symbol: None,
        expiry: market.expiry,
        yt_address: market.yt_address,
        yt_decimals: None,
        group: None,
        tvl: Some(1_000_000.0),
        volume_24h: Some(250_000.0),
        implied_apy: Some(8.0),
    }
}

#[must_use]
pub fn raw_quote(aggregator: &str, amount_out: u128) -> RawQuote {
    RawQuote {
        aggregator: aggregator.to_string(),
        amount_out,
        effective_apy: None,
        implied_apy: None,
        price_impact: None,
    }
}

#[must_use]
pub fn wallet(address: &str) -> Wallet {
    Wallet::new(address, WalletTier::Smart)
}

#[must_use]
pub fn transaction(tx_hash: &str, market_address: &str, action: TxAction) -> WalletTransaction {
    WalletTransaction {
        tx_hash: tx_hash.to_string(),
        chain_id: 1,
        market_address: market_address.to_string(),
        action,
        timestamp: Utc::now() - Duration::hours(1),
        value_usd: 50_000.0,
        yt_price: Some(0.05),
        pt_price: Some(0.95),
        profit_usd: None,
    }
}

#[must_use]
pub fn limit_order(order_id: &str, status: OrderStatus) -> WalletLimitOrder {
    WalletLimitOrder {
        order_id: order_id.to_string(),
        chain_id: 1,
        market_address: None,
        status,
        side: OrderSide::LongYield,
        notional_usd: Some(25_000.0),
        ln_implied_rate: Some("188461005086490266".to_string()),
        timestamp: Utc::now() - Duration::hours(2),
    }
}

/// Config with one chain, two aggregators and zero scheduling delays so
/// loops run fast under test.
#[must_use]
pub fn test_config() -> Config {
    let toml = r#"
        [network]
        api_url = "http://localhost:0"

        [[chains]]
        id = 1
        name = "ethereum"
        stablecoin = "0xdac17f958d2ee523a2206206994597c13d831ec7"
        aggregators = ["kyberswap", "odos"]

        [scheduler]
        market_delay_secs = 0
        refresh_interval_secs = 1
        quote_timeout_secs = 1

        [smart_money]
        wallet_delay_secs = 0
    "#;
    toml::from_str(toml).expect("test config parses")
}
