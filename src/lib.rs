//! Pendlewatch - Pendle yield-market monitoring and notification.
//!
//! This crate continuously price-tests Pendle markets by quoting a fixed
//! stablecoin notional into each market's yield token across several swap
//! aggregators, detects threshold crossings and implied-APR moves, follows
//! the on-chain activity of selected wallets, and pushes alerts to Telegram.
//!
//! # Architecture
//!
//! A single scheduler walks the monitored markets in a round-robin cycle.
//! Each tick fans out to every configured aggregator through the quote
//! orchestrator, normalizes the raw outputs into one composite quote, feeds
//! it to the transition detector, commits the resulting market state and only
//! then hands events to the notifier registry. Delivery is best effort; state
//! is not.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment-only secrets
//! - [`domain`] - Markets, quotes, wallet activity and detector state
//! - [`error`] - Error types for the crate
//! - [`ports`] - Traits the engine consumes: quotes, prices, catalog, activity
//! - [`pendle`] - REST clients for the Pendle v2 API
//! - [`quote`] - Fan-out orchestration and quote normalization
//! - [`detector`] - Threshold and APR-change transition rules
//! - [`scheduler`] - Round-robin price-test cycle
//! - [`catalog`] - Periodic market-catalog synchronization
//! - [`smartmoney`] - Tracked-wallet activity updates
//! - [`store`] - Market and wallet persistence traits plus the in-memory store
//! - [`service`] - Events, the notifier registry and the Telegram channel
//! - [`cli`] - Operator-facing output
//! - [`app`] - Application wiring
//!
//! # Features
//!
//! - `telegram` (default) - Telegram notification channel via `teloxide`
//! - `testkit` - Scripted providers and builders for integration tests

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod detector;
pub mod domain;
pub mod error;
pub mod pendle;
pub mod ports;
pub mod quote;
pub mod scheduler;
pub mod service;
pub mod smartmoney;
pub mod store;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
