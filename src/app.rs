//! Application wiring: builds the clients, stores and background jobs and
//! runs them until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::catalog::CatalogSync;
use crate::config::Config;
use crate::domain::{CompositeQuote, Market, MarketId, Wallet};
use crate::error::{Error, Result};
use crate::pendle::{http_client, ActivityClient, AssetPriceClient, CatalogClient, ConvertClient};
use crate::quote::QuoteOrchestrator;
use crate::scheduler::CycleScheduler;
use crate::service::{LogNotifier, NotifierRegistry};
use crate::smartmoney::SmartMoneyUpdater;
use crate::store::{MarketStore, MemoryStore, WalletStore};

pub struct App;

impl App {
    /// Runs the monitoring daemon: the price-test cycle, the smart-money
    /// updater and the periodic catalog sync.
    pub async fn run(config: Config) -> Result<()> {
        let config = Arc::new(config);
        let store = MemoryStore::new();
        let notifiers = Arc::new(build_notifiers(&config));

        let client = http_client(Duration::from_secs(config.network.request_timeout_secs))?;
        let base = config.network.api_url.clone();
        let convert = Arc::new(ConvertClient::new(client.clone(), base.clone(), &config.pricing));
        let prices = Arc::new(AssetPriceClient::new(client.clone(), base.clone()));
        let catalog_client = Arc::new(CatalogClient::new(client.clone(), base.clone()));
        let activity = Arc::new(ActivityClient::new(client, base));

        let catalog = Arc::new(CatalogSync::new(
            Arc::clone(&config),
            catalog_client,
            store.clone() as Arc<dyn MarketStore>,
            Arc::clone(&notifiers),
        ));

        // Initial sync populates the store so the configured markets can
        // enter the rotation. A failure here is retried on the next tick.
        if let Err(err) = catalog.sync().await {
            error!(error = %err, "initial catalog sync failed");
        }
        seed_monitored(&config, store.as_ref())?;
        seed_wallets(&config, store.as_ref())?;

        let orchestrator = Arc::new(QuoteOrchestrator::new(Arc::clone(&config), convert, prices));
        let scheduler = Arc::new(CycleScheduler::new(
            Arc::clone(&config),
            orchestrator,
            store.clone() as Arc<dyn MarketStore>,
            Arc::clone(&notifiers),
        ));
        scheduler.start();

        let updater = SmartMoneyUpdater::new(
            Arc::clone(&config),
            activity,
            store.clone() as Arc<dyn MarketStore>,
            store.clone() as Arc<dyn WalletStore>,
            Arc::clone(&notifiers),
        );

        let catalog_interval = Duration::from_secs(config.scheduler.catalog_sync_interval_secs);
        let catalog_loop = async {
            loop {
                tokio::time::sleep(catalog_interval).await;
                if let Err(err) = catalog.sync().await {
                    warn!(error = %err, "catalog sync failed");
                }
                if let Err(err) = seed_monitored(&config, store.as_ref()) {
                    warn!(error = %err, "monitoring seed failed");
                }
            }
        };

        let smart_money_enabled = config.smart_money.enabled;
        let pass_delay = Duration::from_secs(config.smart_money.wallet_delay_secs.max(1));
        let smart_loop = async {
            if !smart_money_enabled {
                info!("smart-money tracking disabled");
                std::future::pending::<()>().await;
            }
            loop {
                updater.update_all().await;
                tokio::time::sleep(pass_delay).await;
            }
        };

        info!("pendlewatch running");
        tokio::select! {
            _ = catalog_loop => {}
            _ = smart_loop => {}
        }
        scheduler.stop().await;
        Ok(())
    }

    /// One-shot composite quote for a single market, used by the `quote`
    /// subcommand.
    pub async fn single_quote(
        config: Config,
        chain_id: u64,
        address: &str,
    ) -> Result<CompositeQuote> {
        let config = Arc::new(config);
        let id = MarketId::new(chain_id, address);

        let client = http_client(Duration::from_secs(config.network.request_timeout_secs))?;
        let base = config.network.api_url.clone();
        let catalog = CatalogClient::new(client.clone(), base.clone());
        let summary = catalog
            .market_details(id.address())
            .await?
            .ok_or_else(|| Error::UnknownMarket { market: id.clone() })?;

        let mut market = Market::new(id, summary.name);
        market.expiry = summary.expiry;
        market.yt_address = summary.yt_address;
        if let Some(decimals) = summary.yt_decimals {
            market.yt_decimals = decimals;
        }

        let convert = Arc::new(ConvertClient::new(client.clone(), base.clone(), &config.pricing));
        let prices = Arc::new(AssetPriceClient::new(client, base));
        let orchestrator = QuoteOrchestrator::new(config, convert, prices);
        orchestrator.quote(&market).await
    }
}

fn build_notifiers(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    #[cfg(feature = "telegram")]
    if config.telegram.enabled {
        match crate::service::TelegramConfig::from_env(&config.telegram) {
            Some(telegram) => {
                registry.register(Box::new(crate::service::TelegramNotifier::new(telegram)));
                info!("Telegram notifications enabled");
            }
            None => warn!("Telegram enabled but TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set"),
        }
    }
    #[cfg(not(feature = "telegram"))]
    let _ = config;

    registry
}

/// Marks the configured markets as monitored. Addresses the catalog does not
/// know yet are logged and picked up on a later sync.
fn seed_monitored(config: &Config, store: &dyn MarketStore) -> Result<()> {
    for chain in &config.chains {
        for address in &chain.markets {
            let id = MarketId::new(chain.id, address);
            match store.get_market(&id)? {
                Some(_) => store.set_monitored(&id, true)?,
                None => warn!(market = %id, "configured market not in catalog yet"),
            }
        }
    }
    Ok(())
}

fn seed_wallets(config: &Config, store: &dyn WalletStore) -> Result<()> {
    for entry in &config.smart_money.wallets {
        let mut wallet = Wallet::new(&entry.address, entry.tier);
        wallet.name = entry.name.clone();
        store.add_wallet(wallet)?;
    }
    Ok(())
}
