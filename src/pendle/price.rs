use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::QuoteError;
use crate::ports::PriceSource;

use super::messages::AssetPricesResponse;

/// Asset price client for yield-token USD valuations.
pub struct AssetPriceClient {
    client: Client,
    base_url: String,
}

impl AssetPriceClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for AssetPriceClient {
    async fn usd_price(&self, chain_id: u64, address: &str) -> Result<Option<f64>, QuoteError> {
        let asset_id = format!("{}-{}", chain_id, address.to_lowercase());
        let url = format!("{}/core/v1/prices/assets", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", asset_id.as_str()),
                ("chainId", &chain_id.to_string()),
                ("type", "YT"),
            ])
            .send()
            .await
            .map_err(QuoteError::from)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteError::RateLimited);
        }
        if !status.is_success() {
            return Err(QuoteError::Http(format!("asset prices returned {status}")));
        }

        let body: AssetPricesResponse = response.json().await.map_err(QuoteError::from)?;
        let price = body.prices.get(&asset_id).copied();
        debug!(asset = %asset_id, price = ?price, "asset price");
        Ok(price)
    }
}
