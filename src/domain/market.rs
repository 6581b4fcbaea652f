use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a Pendle market: chain id plus on-chain address.
///
/// Addresses are normalized to lowercase on construction so that lookups and
/// set-difference operations never depend on checksum casing. The `Display`
/// form (`"{chain}-{address}"`) matches the Pendle asset-id wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketId {
    chain_id: u64,
    address: String,
}

impl MarketId {
    pub fn new(chain_id: u64, address: impl Into<String>) -> Self {
        Self {
            chain_id,
            address: address.into().to_lowercase(),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.chain_id, self.address)
    }
}

/// A monitored Pendle market (one YT/PT pool with a fixed expiry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub name: String,
    pub symbol: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    /// Yield-token address, the output side of every price test.
    pub yt_address: Option<String>,
    /// Decimals of the yield token; Pendle YTs are 18 unless the catalog says
    /// otherwise.
    pub yt_decimals: u32,
    pub monitored: bool,
    pub group: Option<String>,
    pub tvl: Option<f64>,
    pub volume_24h: Option<f64>,
    pub implied_apy: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl Market {
    pub fn new(id: MarketId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            symbol: None,
            expiry: None,
            yt_address: None,
            yt_decimals: 18,
            monitored: false,
            group: None,
            tvl: None,
            volume_24h: None,
            implied_apy: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the market has passed its expiry as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiry, Some(expiry) if expiry <= now)
    }

    /// Remaining tenor in whole minutes, `None` once expired or when the
    /// catalog never reported an expiry.
    pub fn minutes_to_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        let expiry = self.expiry?;
        let minutes = (expiry - now).num_minutes();
        (minutes > 0).then_some(minutes)
    }
}

/// One entry of the upstream market catalog, before it is merged into the
/// store.
#[derive(Debug, Clone)]
pub struct MarketSummary {
    pub id: MarketId,
    pub name: String,
    pub symbol: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub yt_address: Option<String>,
    pub yt_decimals: Option<u32>,
    pub group: Option<String>,
    pub tvl: Option<f64>,
    pub volume_24h: Option<f64>,
    pub implied_apy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn market_id_normalizes_address_case() {
        let a = MarketId::new(1, "0xABCDEF");
        let b = MarketId::new(1, "0xabcdef");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1-0xabcdef");
    }

    #[test]
    fn minutes_to_expiry_is_none_when_expired() {
        let now = Utc::now();
        let mut market = Market::new(MarketId::new(1, "0xaa"), "reUSDe");
        market.expiry = Some(now - Duration::hours(1));
        assert!(market.is_expired(now));
        assert_eq!(market.minutes_to_expiry(now), None);
    }

    #[test]
    fn minutes_to_expiry_counts_whole_minutes() {
        let now = Utc::now();
        let mut market = Market::new(MarketId::new(1, "0xaa"), "reUSDe");
        market.expiry = Some(now + Duration::minutes(97_832));
        assert_eq!(market.minutes_to_expiry(now), Some(97_832));
    }
}
