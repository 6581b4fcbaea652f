//! Thin REST clients for the Pendle v2 API.
//!
//! Clients share one [`reqwest::Client`] and never retry inline. A failed
//! call surfaces as a typed error and the next scheduled cycle is the retry.

mod activity;
mod convert;
mod markets;
mod messages;
mod price;

pub use activity::ActivityClient;
pub use convert::ConvertClient;
pub use markets::CatalogClient;
pub use price::AssetPriceClient;

use std::time::Duration;

use crate::error::Result;

const USER_AGENT: &str = concat!("pendlewatch/", env!("CARGO_PKG_VERSION"));

/// The shared HTTP client every Pendle client is built from.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
