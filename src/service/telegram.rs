//! Telegram notification backend.
//!
//! Requires the `telegram` feature. Messages use HTML parse mode with deep
//! links into the Pendle app.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::domain::OperationKind;

use super::{
    AprChangeEvent, CatalogEvent, Event, LargeOrderEvent, Notifier, OpportunityEvent,
    WalletOperationEvent,
};

/// Configuration for the Telegram notifier.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
    /// Chat ID to send notifications to.
    pub chat_id: i64,
    pub notify_opportunities: bool,
    pub notify_apr_changes: bool,
    pub notify_wallet_activity: bool,
}

impl TelegramConfig {
    /// Credentials come from the environment, never from the config file.
    pub fn from_env(app: &crate::config::TelegramAppConfig) -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .and_then(|s| s.parse().ok())?;

        Some(Self {
            bot_token,
            chat_id,
            notify_opportunities: app.notify_opportunities,
            notify_apr_changes: app.notify_apr_changes,
            notify_wallet_activity: app.notify_wallet_activity,
        })
    }
}

/// Telegram notifier that hands events to a background worker so `notify`
/// never blocks the detector.
pub struct TelegramNotifier {
    sender: mpsc::UnboundedSender<Event>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(telegram_worker(config, receiver));
        Self { sender }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("Telegram notifier channel closed");
        }
    }
}

async fn telegram_worker(config: TelegramConfig, mut receiver: mpsc::UnboundedReceiver<Event>) {
    let bot = Bot::new(&config.bot_token);
    let chat_id = ChatId(config.chat_id);

    info!(chat_id = config.chat_id, "Telegram notifier started");

    while let Some(event) = receiver.recv().await {
        let message = match &event {
            Event::HighValueOpportunity(e) if config.notify_opportunities => {
                Some(format_opportunity(e))
            }
            Event::LargeOrder(e) if config.notify_opportunities => Some(format_large_order(e)),
            Event::AprChange(e) if config.notify_apr_changes => Some(format_apr_change(e)),
            Event::WalletOperation(e) if config.notify_wallet_activity => {
                Some(format_wallet_operation(e))
            }
            Event::CatalogSynced(e) => Some(format_catalog(e)),
            _ => None,
        };

        if let Some(text) = message {
            if let Err(e) = bot
                .send_message(chat_id, &text)
                .parse_mode(ParseMode::Html)
                .await
            {
                error!(error = %e, "Failed to send Telegram message");
            }
        }
    }

    warn!("Telegram worker shutting down");
}

fn market_url(address: &str, chain_name: Option<&str>) -> String {
    let chain_param = chain_name
        .map(|name| format!("&chain={name}"))
        .unwrap_or_default();
    format!("https://app.pendle.finance/trade/markets/{address}/swap?view=yt{chain_param}")
}

fn wallet_url(address: &str) -> String {
    format!("https://app.pendle.finance/trade/dashboard/user/{address}")
}

fn market_link(name: &str, address: &str, chain_name: Option<&str>) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        market_url(address, chain_name),
        escape_html(name)
    )
}

fn format_optional_apy(apy: Option<f64>) -> String {
    match apy {
        Some(apy) => format!("{apy:.2}%"),
        None => "unavailable".to_string(),
    }
}

fn format_opportunity(e: &OpportunityEvent) -> String {
    format!(
        "<b>🎯 High-Value Opportunity</b>\n\n\
         Market: {}\n\
         Aggregator: {}\n\
         Value: ${:.2} (for ${} in)\n\
         Effective APY: {}\n\
         Implied APY: {}",
        market_link(&e.market_name, e.market.address(), e.chain_name.as_deref()),
        escape_html(&e.aggregator),
        e.usd_value,
        e.notional,
        format_optional_apy(e.effective_apy),
        format_optional_apy(e.implied_apy),
    )
}

fn format_large_order(e: &LargeOrderEvent) -> String {
    format!(
        "<b>🐋 Large Order</b>\n\n\
         Market: {}\n\
         Aggregator: {}\n\
         Value: ${:.2} (threshold ${})",
        market_link(&e.market_name, e.market.address(), e.chain_name.as_deref()),
        escape_html(&e.aggregator),
        e.usd_value,
        e.threshold,
    )
}

fn format_apr_change(e: &AprChangeEvent) -> String {
    let arrow = if e.delta() >= 0.0 { "📈" } else { "📉" };
    format!(
        "<b>{arrow} Implied APY Change</b>\n\n\
         Market: {}\n\
         {:.2}% → {:.2}% ({:+.2}pp)",
        market_link(&e.market_name, e.market.address(), e.chain_name.as_deref()),
        e.previous,
        e.current,
        e.delta(),
    )
}

fn format_wallet_operation(e: &WalletOperationEvent) -> String {
    let op = &e.operation;
    let market = match &op.market {
        Some(id) => market_link(&op.market_label, id.address(), e.chain_name.as_deref()),
        None => escape_html(&op.market_label),
    };
    let mut lines = format!(
        "<b>💰 Smart Money Update</b>\n\n\
         Wallet: <a href=\"{}\">{}</a> ({})\n\
         Action: {}\n\
         Market: {}",
        wallet_url(&e.wallet_address),
        escape_html(&e.wallet_name),
        e.tier.label(),
        operation_emoji_label(op.kind),
        market,
    );
    if let Some(amount) = op.amount_usd.filter(|_| op.kind.has_amount()) {
        lines.push_str(&format!("\nAmount: ${amount:.2}"));
    }
    if let Some(apy) = op.implied_yield {
        lines.push_str(&format!("\nImplied yield: {apy:.2}%"));
    }
    if let Some(profit) = op.profit_usd.filter(|_| op.kind.has_profit()) {
        lines.push_str(&format!("\nProfit: ${profit:.2}"));
    }
    lines.push_str(&format!(
        "\nTime: {}",
        op.timestamp.format("%Y-%m-%d %H:%M UTC")
    ));
    lines
}

fn operation_emoji_label(kind: OperationKind) -> String {
    let emoji = match kind {
        OperationKind::MarketBuy | OperationKind::LimitBuy => "🟢",
        OperationKind::MarketSell | OperationKind::LimitSell => "🔴",
        OperationKind::YieldRedemption => "🎁",
        _ => "📋",
    };
    format!("{emoji} {}", kind.label())
}

fn format_catalog(e: &CatalogEvent) -> String {
    format!(
        "<b>📚 Catalog Synced</b>\n\n\
         Date: {}\n\
         Active markets: {}\n\
         Added: {}\n\
         Removed: {}",
        e.date,
        e.total,
        e.added.len(),
        e.removed.len(),
    )
}

/// Escape text destined for Telegram HTML parse mode.
fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketId;
    use rust_decimal_macros::dec;

    #[test]
    fn escapes_html_special_chars() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn market_url_includes_chain_when_known() {
        assert_eq!(
            market_url("0xaa", Some("ethereum")),
            "https://app.pendle.finance/trade/markets/0xaa/swap?view=yt&chain=ethereum"
        );
        assert_eq!(
            market_url("0xaa", None),
            "https://app.pendle.finance/trade/markets/0xaa/swap?view=yt"
        );
    }

    #[test]
    fn opportunity_message_renders_unavailable_apy() {
        let text = format_opportunity(&OpportunityEvent {
            market: MarketId::new(1, "0xaa"),
            market_name: "reUSDe <test>".to_string(),
            chain_name: Some("ethereum".to_string()),
            aggregator: "kyberswap".to_string(),
            usd_value: dec!(103.50),
            notional: dec!(100),
            effective_apy: None,
            implied_apy: Some(12.345),
        });
        assert!(text.contains("Effective APY: unavailable"));
        assert!(text.contains("Implied APY: 12.35%"));
        assert!(text.contains("reUSDe &lt;test&gt;"));
        assert!(text.contains("$103.50"));
    }

    #[test]
    fn apr_change_message_shows_signed_delta() {
        let text = format_apr_change(&AprChangeEvent {
            market: MarketId::new(1, "0xaa"),
            market_name: "reUSDe".to_string(),
            chain_name: None,
            previous: 10.0,
            current: 7.5,
        });
        assert!(text.contains("📉"));
        assert!(text.contains("10.00% → 7.50% (-2.50pp)"));
    }
}
