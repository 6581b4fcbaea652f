use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{CompositeQuote, Market, MarketId, QuoteFailure, QuoteResult};
use crate::error::{ConfigError, Error, QuoteError, Result};
use crate::ports::{PriceSource, QuoteProvider, QuoteRequest};

use super::normalizer::{normalize, NormalizeInput};

/// Runs one full price test for a market: fan out one quote per configured
/// aggregator, normalize, rank.
///
/// At most one orchestration runs per market at a time. Scheduler passes go
/// through [`try_quote_then`](Self::try_quote_then) and skip when one is
/// already in flight; manual triggers go through
/// [`quote_then`](Self::quote_then) and wait for the in-flight pass instead
/// of starting a duplicate. The `_then` variants keep the market's exclusion
/// held while the caller's commit step runs, so a state read-modify-write
/// after the quote cannot interleave with another pass for the same market.
pub struct QuoteOrchestrator {
    config: Arc<Config>,
    provider: Arc<dyn QuoteProvider>,
    prices: Arc<dyn PriceSource>,
    locks: DashMap<MarketId, Arc<Mutex<()>>>,
}

impl QuoteOrchestrator {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn QuoteProvider>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            config,
            provider,
            prices,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, market: &MarketId) -> Arc<Mutex<()>> {
        self.locks
            .entry(market.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Scheduler entry point: quote unless an orchestration for this market
    /// is already in flight, in which case skip (`Ok(None)`), never queue.
    /// `commit` runs on success while the market's lock is still held.
    pub async fn try_quote_then<F>(
        &self,
        market: &Market,
        commit: F,
    ) -> Result<Option<CompositeQuote>>
    where
        F: FnOnce(&CompositeQuote) -> Result<()>,
    {
        let lock = self.lock_for(&market.id);
        let Ok(_guard) = lock.try_lock() else {
            debug!(market = %market.id, "quote already in flight, skipping");
            return Ok(None);
        };
        let composite = self.quote_market(market).await?;
        commit(&composite)?;
        Ok(Some(composite))
    }

    /// [`try_quote_then`](Self::try_quote_then) without a commit step.
    pub async fn try_quote(&self, market: &Market) -> Result<Option<CompositeQuote>> {
        self.try_quote_then(market, |_| Ok(())).await
    }

    /// Manual entry point: waits for any in-flight orchestration to finish,
    /// then runs its own pass. Never produces a duplicate concurrent run.
    /// `commit` runs on success before the market's lock is released.
    pub async fn quote_then<F>(&self, market: &Market, commit: F) -> Result<CompositeQuote>
    where
        F: FnOnce(&CompositeQuote) -> Result<()>,
    {
        let lock = self.lock_for(&market.id);
        let _guard = lock.lock().await;
        let composite = self.quote_market(market).await?;
        commit(&composite)?;
        Ok(composite)
    }

    /// [`quote_then`](Self::quote_then) without a commit step.
    pub async fn quote(&self, market: &Market) -> Result<CompositeQuote> {
        self.quote_then(market, |_| Ok(())).await
    }

    async fn quote_market(&self, market: &Market) -> Result<CompositeQuote> {
        let chain_id = market.id.chain_id();
        let chain = self
            .config
            .chain(chain_id)
            .ok_or(Error::UnknownChain(chain_id))?;
        let yt_address = market.yt_address.as_deref().ok_or(Error::UnknownMarket {
            market: market.id.clone(),
        })?;

        let notional = self.config.pricing.notional;
        let amount_in = base_units(notional, chain.stablecoin_decimals)?;

        // One price lookup per pass; a failed lookup degrades the USD value
        // to unavailable rather than failing the whole test.
        let yt_price_usd = match self.prices.usd_price(chain_id, yt_address).await {
            Ok(price) => price,
            Err(err) => {
                warn!(market = %market.id, error = %err, "price lookup failed");
                None
            }
        };

        let timeout = Duration::from_secs(self.config.scheduler.quote_timeout_secs);
        let calls = chain.aggregators.iter().map(|aggregator| {
            let request = QuoteRequest {
                chain_id,
                token_in: chain.stablecoin.clone(),
                token_out: yt_address.to_string(),
                amount_in,
                aggregator: aggregator.clone(),
            };
            let provider = Arc::clone(&self.provider);
            async move {
                let aggregator = request.aggregator.clone();
                let outcome = match tokio::time::timeout(timeout, provider.quote(&request)).await {
                    Ok(result) => result,
                    Err(_) => Err(QuoteError::Timeout(timeout.as_millis() as u64)),
                };
                (aggregator, outcome)
            }
        });

        let minutes_to_expiry = market.minutes_to_expiry(chrono::Utc::now());
        let mut quotes: Vec<QuoteResult> = Vec::new();
        let mut failures: Vec<QuoteFailure> = Vec::new();
        for (aggregator, outcome) in join_all(calls).await {
            match outcome {
                Ok(raw) => quotes.push(normalize(NormalizeInput {
                    raw: &raw,
                    yt_decimals: market.yt_decimals,
                    yt_price_usd,
                    notional,
                    minutes_to_expiry,
                })),
                Err(error) => {
                    warn!(market = %market.id, aggregator, error = %error, "quote failed");
                    failures.push(QuoteFailure { aggregator, error });
                }
            }
        }

        if quotes.is_empty() {
            return Err(Error::AllAggregatorsFailed {
                market: market.id.clone(),
            });
        }

        Ok(CompositeQuote::new(market.id.clone(), quotes, failures))
    }
}

/// Converts the configured notional into stablecoin base units.
fn base_units(notional: Decimal, decimals: u32) -> Result<u128> {
    let scale = 10u64
        .checked_pow(decimals)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "chains.stablecoin_decimals",
            reason: format!("{decimals} decimals overflow the notional scale"),
        })?;
    (notional * Decimal::from(scale))
        .trunc()
        .to_u128()
        .ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "pricing.notional",
                reason: "does not fit in base units".to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn notional_scales_to_base_units() {
        assert_eq!(base_units(dec!(100), 6).unwrap(), 100_000_000);
        assert_eq!(base_units(dec!(0.5), 6).unwrap(), 500_000);
        assert_eq!(base_units(dec!(100), 18).unwrap(), 100_000_000_000_000_000_000);
    }

    #[test]
    fn absurd_decimals_are_rejected() {
        assert!(base_units(dec!(100), 40).is_err());
    }
}
