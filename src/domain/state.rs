use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Last observed detection state for one market.
///
/// Written only by the detector, immediately after its own orchestrator pass
/// for the market; the one-orchestration-per-market rule makes the
/// read-modify-write safe without extra locking.
///
/// The value and size flags re-baseline to the latest observation every
/// cycle. The APY baseline moves only when an APR-change notification fires,
/// so drift accumulated across many small steps is still caught. That
/// asymmetry is intentional; keep it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketState {
    /// Best USD value seen on the last completed cycle.
    pub last_value: Option<Decimal>,
    /// True while the best value sits above the opportunity threshold. The
    /// opportunity rule fires on the rising edge only and re-arms once the
    /// value drops back below.
    pub above_value_threshold: bool,
    /// Same episode flag for the large-order size rule.
    pub above_size_threshold: bool,
    /// Implied APY at the time of the last APR-change notification.
    pub apy_baseline: Option<f64>,
    pub last_checked: Option<DateTime<Utc>>,
}
