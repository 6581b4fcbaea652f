//! Exchange-agnostic domain types: markets, quotes, per-market detection
//! state, tracked wallets and their operations.

mod history;
mod market;
mod quote;
mod state;
mod wallet;

pub use history::HistoryEntry;
pub use market::{Market, MarketId, MarketSummary};
pub use quote::{CompositeQuote, QuoteFailure, QuoteResult};
pub use state::MarketState;
pub use wallet::{Operation, OperationKey, OperationKind, Wallet, WalletTier};
