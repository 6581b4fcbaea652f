use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::QuoteError;

use super::MarketId;

/// A normalized quote from one aggregator: the fixed stablecoin notional
/// swapped into the market's yield token.
///
/// Optional fields were not reported by the aggregator and render as
/// "unavailable", never as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteResult {
    pub aggregator: String,
    /// Raw output amount in the yield token's base units.
    pub amount_raw: u128,
    /// Decimal-adjusted output amount.
    pub amount: Decimal,
    /// Output value in USD (amount x yield-token price), when a price was
    /// available.
    pub usd_value: Option<Decimal>,
    /// Annualized yield realized by this specific trade, percentage points.
    pub effective_apy: Option<f64>,
    /// Market-implied annualized yield after the trade, percentage points.
    pub implied_apy: Option<f64>,
    pub price_impact: Option<f64>,
}

/// A quote attempt that produced no usable result, kept for observability.
#[derive(Debug, Clone)]
pub struct QuoteFailure {
    pub aggregator: String,
    pub error: QuoteError,
}

/// All aggregator results for one market at one point in time.
///
/// Successes are ordered descending by USD value; ties break ascending by
/// aggregator name so repeated cycles rank identically and notifications stay
/// deterministic.
#[derive(Debug, Clone)]
pub struct CompositeQuote {
    pub market: MarketId,
    pub quoted_at: DateTime<Utc>,
    pub quotes: Vec<QuoteResult>,
    pub failures: Vec<QuoteFailure>,
}

impl CompositeQuote {
    pub fn new(
        market: MarketId,
        mut quotes: Vec<QuoteResult>,
        failures: Vec<QuoteFailure>,
    ) -> Self {
        quotes.sort_by(|a, b| {
            let va = a.usd_value.unwrap_or(Decimal::ZERO);
            let vb = b.usd_value.unwrap_or(Decimal::ZERO);
            vb.cmp(&va).then_with(|| a.aggregator.cmp(&b.aggregator))
        });
        Self {
            market,
            quoted_at: Utc::now(),
            quotes,
            failures,
        }
    }

    /// The highest-value successful quote, if any aggregator succeeded.
    pub fn best(&self) -> Option<&QuoteResult> {
        self.quotes.first()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
