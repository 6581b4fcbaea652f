use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::PricingConfig;
use crate::error::QuoteError;
use crate::ports::{QuoteProvider, QuoteRequest, RawQuote};

use super::messages::{ConvertResponse, ConvertRoute};

/// Quote client for the convert endpoint. Simulates a swap of the fixed
/// notional through a single aggregator; nothing is ever executed.
pub struct ConvertClient {
    client: Client,
    base_url: String,
    receiver: String,
    slippage: f64,
}

impl ConvertClient {
    pub fn new(client: Client, base_url: impl Into<String>, pricing: &PricingConfig) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            receiver: pricing.receiver.to_lowercase(),
            slippage: pricing.slippage,
        }
    }

    /// Picks the highest-output route among those the requested aggregator
    /// returned. Aggregator names match case-insensitively with separators
    /// stripped (`KYBER_SWAP` matches `kyberswap`).
    fn best_route<'a>(
        routes: &'a [ConvertRoute],
        aggregator: &str,
    ) -> Option<(&'a ConvertRoute, u128)> {
        let wanted = aggregator.to_lowercase();
        routes
            .iter()
            .filter(|route| {
                route
                    .data
                    .aggregator_type
                    .as_deref()
                    .map(|t| t.to_lowercase().replace(['_', '-'], "") == wanted)
                    .unwrap_or(false)
            })
            .filter_map(|route| {
                let amount = route
                    .outputs
                    .first()
                    .and_then(|o| o.amount.as_deref())
                    .and_then(|a| a.parse::<u128>().ok())?;
                Some((route, amount))
            })
            .max_by_key(|(_, amount)| *amount)
    }
}

#[async_trait]
impl QuoteProvider for ConvertClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<RawQuote, QuoteError> {
        let url = format!("{}/core/v2/sdk/{}/convert", self.base_url, request.chain_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("receiver", self.receiver.as_str()),
                ("slippage", &self.slippage.to_string()),
                ("tokensIn", &request.token_in.to_lowercase()),
                ("tokensOut", &request.token_out.to_lowercase()),
                ("amountsIn", &request.amount_in.to_string()),
                ("enableAggregator", "true"),
                ("aggregators", &request.aggregator),
                ("additionalData", "impliedApy,effectiveApy"),
            ])
            .send()
            .await
            .map_err(QuoteError::from)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteError::RateLimited);
        }
        if !status.is_success() {
            return Err(QuoteError::Http(format!("convert returned {status}")));
        }

        let body: ConvertResponse = response.json().await.map_err(QuoteError::from)?;
        debug!(
            aggregator = %request.aggregator,
            routes = body.routes.len(),
            "convert response"
        );

        let Some((route, amount)) = Self::best_route(&body.routes, &request.aggregator) else {
            warn!(aggregator = %request.aggregator, "aggregator absent from convert response");
            return Err(QuoteError::NoLiquidity(format!(
                "aggregator {} returned no route",
                request.aggregator
            )));
        };
        if amount == 0 {
            return Err(QuoteError::NoLiquidity(format!(
                "aggregator {} returned zero output",
                request.aggregator
            )));
        }

        Ok(RawQuote {
            aggregator: request.aggregator.clone(),
            amount_out: amount,
            effective_apy: route.data.effective_apy,
            implied_apy: route.data.implied_apy.as_ref().and_then(|apy| apy.after),
            price_impact: route.data.price_impact,
        })
    }
}
