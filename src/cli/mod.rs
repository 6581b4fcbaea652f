//! Operator-facing command line surface.

pub mod output;
pub mod quote;
