//! The price-test engine: per-aggregator normalization and the per-market
//! fan-out orchestrator.

mod normalizer;
mod orchestrator;

pub use normalizer::{normalize, NormalizeInput};
pub use orchestrator::QuoteOrchestrator;
