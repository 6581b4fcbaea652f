//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for sensitive values (`TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`
//! are read by the telegram notifier at runtime, never from the file).

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Chains eligible for price testing. A market on a chain without an
    /// entry here cannot be quoted.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub smart_money: SmartMoneyConfig,
    #[serde(default)]
    pub telegram: TelegramAppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Pendle API base, e.g. `https://api-v2.pendle.finance`.
    pub api_url: String,
    /// Per-request timeout for every upstream call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// One quotable chain: where the reference stablecoin lives and which
/// aggregators are queried for markets on it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub id: u64,
    pub name: String,
    /// Reference stablecoin address (the fixed input side of every quote).
    pub stablecoin: String,
    #[serde(default = "default_stablecoin_decimals")]
    pub stablecoin_decimals: u32,
    #[serde(default = "default_aggregators")]
    pub aggregators: Vec<String>,
    /// Market addresses to monitor on this chain. They enter the rotation
    /// after the first catalog sync resolves them.
    #[serde(default)]
    pub markets: Vec<String>,
}

fn default_stablecoin_decimals() -> u32 {
    6
}

fn default_aggregators() -> Vec<String> {
    vec!["kyberswap".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Fixed input notional in stablecoin units (not base units).
    #[serde(default = "default_notional")]
    pub notional: Decimal,
    #[serde(default = "default_slippage")]
    pub slippage: f64,
    /// Receiver address passed to the convert endpoint; quoting only, nothing
    /// is ever executed.
    #[serde(default = "default_receiver")]
    pub receiver: String,
}

fn default_notional() -> Decimal {
    Decimal::from(100)
}

fn default_slippage() -> f64 {
    0.01
}

fn default_receiver() -> String {
    "0xd8da6bf26964af9d7eed9e03e53415d37aa96045".to_string()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            notional: default_notional(),
            slippage: default_slippage(),
            receiver: default_receiver(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Absolute USD value above which the best quote is a high-value
    /// opportunity (102 for the default 100-unit notional).
    #[serde(default = "default_value_threshold")]
    pub value_threshold: Decimal,
    /// Best-quote notional above which the large-order rule fires,
    /// independent of profitability.
    #[serde(default = "default_size_threshold")]
    pub size_threshold: Decimal,
    /// Minimum |implied APY delta| in percentage points to notify.
    #[serde(default = "default_apr_delta")]
    pub apr_delta: f64,
}

fn default_value_threshold() -> Decimal {
    Decimal::from(102)
}

fn default_size_threshold() -> Decimal {
    Decimal::from(10_000)
}

fn default_apr_delta() -> f64 {
    2.0
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            value_threshold: default_value_threshold(),
            size_threshold: default_size_threshold(),
            apr_delta: default_apr_delta(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Delay between two markets within a cycle lap.
    #[serde(default = "default_market_delay_secs")]
    pub market_delay_secs: u64,
    /// How often the monitored-market list is refreshed from the store.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// How often the upstream catalog is re-synced.
    #[serde(default = "default_catalog_sync_interval_secs")]
    pub catalog_sync_interval_secs: u64,
    /// Markets below this 24h volume are dropped at catalog sync.
    #[serde(default)]
    pub min_volume_24h: f64,
    /// Per-aggregator quote timeout.
    #[serde(default = "default_quote_timeout_secs")]
    pub quote_timeout_secs: u64,
}

fn default_market_delay_secs() -> u64 {
    3
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_catalog_sync_interval_secs() -> u64 {
    86_400
}

fn default_quote_timeout_secs() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            market_delay_secs: default_market_delay_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            catalog_sync_interval_secs: default_catalog_sync_interval_secs(),
            min_volume_24h: 0.0,
            quote_timeout_secs: default_quote_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmartMoneyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lookback window for wallet activity.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,
    /// Delay between two wallets within an update lap.
    #[serde(default = "default_wallet_delay_secs")]
    pub wallet_delay_secs: u64,
    /// On a wallet's first ever sync, notify at most this many of its most
    /// recent operations (everything is still recorded as seen).
    #[serde(default = "default_first_sync_notify_limit")]
    pub first_sync_notify_limit: usize,
    /// Wallets to track.
    #[serde(default)]
    pub wallets: Vec<WalletEntry>,
}

/// One tracked wallet from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletEntry {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_wallet_tier")]
    pub tier: crate::domain::WalletTier,
}

fn default_wallet_tier() -> crate::domain::WalletTier {
    crate::domain::WalletTier::Smart
}

fn default_lookback_hours() -> u64 {
    72
}

fn default_wallet_delay_secs() -> u64 {
    480
}

fn default_first_sync_notify_limit() -> usize {
    5
}

impl Default for SmartMoneyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_hours: default_lookback_hours(),
            wallet_delay_secs: default_wallet_delay_secs(),
            first_sync_notify_limit: default_first_sync_notify_limit(),
            wallets: Vec::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Telegram notification configuration. The bot token and chat id come from
/// the environment, never from the config file; unknown keys here are
/// rejected so a token pasted into the file fails loudly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub notify_opportunities: bool,
    #[serde(default = "default_true")]
    pub notify_apr_changes: bool,
    #[serde(default = "default_true")]
    pub notify_wallet_activity: bool,
}

impl Default for TelegramAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_opportunities: true,
            notify_apr_changes: true,
            notify_wallet_activity: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.network.api_url.is_empty() {
            return Err(ConfigError::MissingField { field: "api_url" }.into());
        }
        if self.chains.is_empty() {
            return Err(ConfigError::MissingField { field: "chains" }.into());
        }
        for chain in &self.chains {
            if chain.stablecoin.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "chains.stablecoin",
                    reason: format!("chain {} has no stablecoin address", chain.id),
                }
                .into());
            }
            if chain.aggregators.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "chains.aggregators",
                    reason: format!("chain {} has no aggregators", chain.id),
                }
                .into());
            }
        }
        if self.pricing.notional <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "pricing.notional",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.detector.apr_delta <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "detector.apr_delta",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Chain configuration by id.
    pub fn chain(&self, id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
        [network]
        api_url = "https://api-v2.pendle.finance"

        [[chains]]
        id = 1
        name = "eth"
        stablecoin = "0xdac17f958d2ee523a2206206994597c13d831ec7"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.pricing.notional, dec!(100));
        assert_eq!(config.detector.value_threshold, dec!(102));
        assert_eq!(config.detector.apr_delta, 2.0);
        assert_eq!(config.scheduler.market_delay_secs, 3);
        assert_eq!(config.scheduler.refresh_interval_secs, 300);
        assert_eq!(config.smart_money.lookback_hours, 72);
        assert_eq!(config.chain(1).unwrap().aggregators, ["kyberswap"]);
        assert_eq!(config.chain(1).unwrap().stablecoin_decimals, 6);
        assert!(config.chain(42161).is_none());
    }

    #[test]
    fn parses_tracked_wallets() {
        let toml = format!(
            "{MINIMAL}\n[[smart_money.wallets]]\naddress = \"0xABC\"\ntier = \"focus\"\n"
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.smart_money.wallets.len(), 1);
        assert_eq!(
            config.smart_money.wallets[0].tier,
            crate::domain::WalletTier::Focus
        );
    }

    #[test]
    fn rejects_missing_chains() {
        let config: Config = toml::from_str(
            r#"
            [network]
            api_url = "https://api-v2.pendle.finance"
        "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_chain_without_aggregators() {
        let config: Config = toml::from_str(
            r#"
            [network]
            api_url = "https://api-v2.pendle.finance"

            [[chains]]
            id = 1
            name = "eth"
            stablecoin = "0xdac17f958d2ee523a2206206994597c13d831ec7"
            aggregators = []
        "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_apr_delta() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.detector.apr_delta = 0.0;
        assert!(config.validate().is_err());
    }
}
