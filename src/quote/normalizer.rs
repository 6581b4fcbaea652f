use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::domain::QuoteResult;
use crate::ports::RawQuote;

const MINUTES_PER_YEAR: f64 = 525_600.0;

/// Everything needed to turn one raw aggregator reply into a normalized
/// quote.
pub struct NormalizeInput<'a> {
    pub raw: &'a RawQuote,
    /// Decimals of the yield token.
    pub yt_decimals: u32,
    /// USD price of one yield token, when the price API knows it.
    pub yt_price_usd: Option<f64>,
    /// The fixed input notional in stablecoin units.
    pub notional: Decimal,
    /// Remaining market tenor in whole minutes, `None` once expired.
    pub minutes_to_expiry: Option<i64>,
}

/// Normalizes a raw quote: decimal adjustment, USD valuation and APY
/// derivation.
///
/// A missing price leaves the USD value absent rather than zero; a zero
/// value would read as a catastrophic quote and trip the detector. The
/// effective APY is taken from the aggregator when reported, otherwise
/// annualized from the USD return over the remaining tenor. Non-positive
/// tenor or ratio yields `None`, never NaN.
pub fn normalize(input: NormalizeInput<'_>) -> QuoteResult {
    let amount = decimal_adjust(input.raw.amount_out, input.yt_decimals);
    let usd_value = input
        .yt_price_usd
        .and_then(Decimal::from_f64)
        .map(|price| amount * price);

    let effective_apy = input
        .raw
        .effective_apy
        .map(to_percentage_points)
        .or_else(|| annualized_return(usd_value, input.notional, input.minutes_to_expiry));

    QuoteResult {
        aggregator: input.raw.aggregator.clone(),
        amount_raw: input.raw.amount_out,
        amount,
        usd_value,
        effective_apy,
        implied_apy: input.raw.implied_apy.map(to_percentage_points),
        price_impact: input.raw.price_impact,
    }
}

fn decimal_adjust(raw: u128, decimals: u32) -> Decimal {
    // Pendle amounts fit comfortably in a 96-bit mantissa; anything that
    // does not is upstream garbage and clamps to zero.
    i128::try_from(raw)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Aggregators report APYs in fractional form (0.05 for 5%).
fn to_percentage_points(apy: f64) -> f64 {
    apy * 100.0
}

fn annualized_return(
    usd_value: Option<Decimal>,
    notional: Decimal,
    minutes_to_expiry: Option<i64>,
) -> Option<f64> {
    let minutes = minutes_to_expiry.filter(|m| *m > 0)?;
    if notional <= Decimal::ZERO {
        return None;
    }
    let ratio = (usd_value? / notional).to_f64().filter(|r| *r > 0.0)?;
    let apy = ratio.powf(MINUTES_PER_YEAR / minutes as f64) - 1.0;
    apy.is_finite().then_some(apy * 100.0)
}
