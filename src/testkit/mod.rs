//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! - [`providers`] - scripted implementations of the engine ports.
//! - [`domain`] - builders for markets, wallets, activity records and a
//!   canonical test configuration.

pub mod domain;
pub mod providers;
