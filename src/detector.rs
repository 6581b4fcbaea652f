//! Threshold-crossing detection over composite quotes.
//!
//! Evaluation is pure: it looks at one composite and the market's previous
//! state, mutates the state, and returns the events to deliver. Callers
//! commit the state before handing events to notifiers, so a failed delivery
//! never rewinds detection.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::config::DetectorConfig;
use crate::domain::{CompositeQuote, MarketState};
use crate::service::{AprChangeEvent, Event, LargeOrderEvent, OpportunityEvent};

/// Market metadata the emitted events carry.
pub struct DetectorContext<'a> {
    pub market_name: &'a str,
    pub chain_name: Option<&'a str>,
    pub notional: Decimal,
}

/// Evaluates one composite against the market's state.
///
/// Rule order is fixed: opportunity, large order, APR change. Each rule
/// emits at most one event per evaluation.
///
/// The opportunity and size rules are episodic: they fire on the rising edge
/// and re-arm only once the value drops back below the threshold, so a
/// market hovering above notifies once per excursion. Their flags re-baseline
/// on every observation. The APY baseline instead moves only when the APR
/// rule fires, so drift accumulated across many small steps still triggers a
/// notification once the total crosses the delta.
pub fn evaluate(
    composite: &CompositeQuote,
    ctx: &DetectorContext<'_>,
    state: &mut MarketState,
    config: &DetectorConfig,
) -> Vec<Event> {
    let mut events = Vec::new();
    let Some(best) = composite.best() else {
        return events;
    };

    // A missing USD value leaves the value and size episodes untouched;
    // re-arming on a price outage would re-notify when the price recovers.
    if let Some(usd_value) = best.usd_value {
        let above_value = usd_value > config.value_threshold;
        if above_value && !state.above_value_threshold {
            events.push(Event::HighValueOpportunity(OpportunityEvent {
                market: composite.market.clone(),
                market_name: ctx.market_name.to_string(),
                chain_name: ctx.chain_name.map(str::to_string),
                aggregator: best.aggregator.clone(),
                usd_value,
                notional: ctx.notional,
                effective_apy: best.effective_apy,
                implied_apy: best.implied_apy,
            }));
        }
        state.above_value_threshold = above_value;

        let above_size = usd_value > config.size_threshold;
        if above_size && !state.above_size_threshold {
            events.push(Event::LargeOrder(LargeOrderEvent {
                market: composite.market.clone(),
                market_name: ctx.market_name.to_string(),
                chain_name: ctx.chain_name.map(str::to_string),
                aggregator: best.aggregator.clone(),
                usd_value,
                threshold: config.size_threshold,
            }));
        }
        state.above_size_threshold = above_size;

        state.last_value = Some(usd_value);
    }

    if let Some(current) = best.implied_apy {
        match state.apy_baseline {
            // First observation seeds the baseline without notifying.
            None => state.apy_baseline = Some(current),
            Some(previous) => {
                if (current - previous).abs() >= config.apr_delta {
                    events.push(Event::AprChange(AprChangeEvent {
                        market: composite.market.clone(),
                        market_name: ctx.market_name.to_string(),
                        chain_name: ctx.chain_name.map(str::to_string),
                        previous,
                        current,
                    }));
                    state.apy_baseline = Some(current);
                }
            }
        }
    }

    state.last_checked = Some(Utc::now());
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketId, QuoteResult};
    use rust_decimal_macros::dec;

    fn composite(usd: Option<Decimal>, implied_apy: Option<f64>) -> CompositeQuote {
        CompositeQuote::new(
            MarketId::new(1, "0xaa"),
            vec![QuoteResult {
                aggregator: "kyberswap".to_string(),
                amount_raw: 0,
                amount: Decimal::ZERO,
                usd_value: usd,
                effective_apy: None,
                implied_apy,
                price_impact: None,
            }],
            vec![],
        )
    }

    fn ctx() -> DetectorContext<'static> {
        DetectorContext {
            market_name: "reUSDe",
            chain_name: Some("ethereum"),
            notional: dec!(100),
        }
    }

    fn run(state: &mut MarketState, usd: Option<Decimal>, apy: Option<f64>) -> Vec<Event> {
        evaluate(
            &composite(usd, apy),
            &ctx(),
            state,
            &DetectorConfig::default(),
        )
    }

    #[test]
    fn fires_once_per_threshold_excursion() {
        let mut state = MarketState::default();

        let first = run(&mut state, Some(dec!(103)), None);
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0], Event::HighValueOpportunity(_)));

        // Still above: episode already notified.
        assert!(run(&mut state, Some(dec!(104)), None).is_empty());

        // Drops below: re-arms silently.
        assert!(run(&mut state, Some(dec!(101)), None).is_empty());

        // Crosses again: second event.
        let again = run(&mut state, Some(dec!(103)), None);
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn state_tracks_latest_best_value() {
        let mut state = MarketState::default();
        let events = run(&mut state, Some(dec!(103)), None);
        assert_eq!(events.len(), 1);
        assert_eq!(state.last_value, Some(dec!(103)));
        assert!(state.above_value_threshold);
        assert!(state.last_checked.is_some());
    }

    #[test]
    fn apy_baseline_seeds_silently_and_moves_only_on_fire() {
        let mut state = MarketState::default();

        // Seeding observation: no event.
        assert!(run(&mut state, None, Some(10.0)).is_empty());
        assert_eq!(state.apy_baseline, Some(10.0));

        // Sub-threshold drift never re-baselines.
        assert!(run(&mut state, None, Some(11.0)).is_empty());
        assert!(run(&mut state, None, Some(11.9)).is_empty());
        assert_eq!(state.apy_baseline, Some(10.0));

        // Cumulative drift crosses the delta: one event, baseline jumps to
        // the firing value.
        let events = run(&mut state, None, Some(12.1));
        assert_eq!(events.len(), 1);
        let Event::AprChange(ref e) = events[0] else {
            panic!("expected AprChange");
        };
        assert_eq!(e.previous, 10.0);
        assert_eq!(e.current, 12.1);
        assert_eq!(state.apy_baseline, Some(12.1));
    }

    #[test]
    fn apr_change_fires_in_both_directions() {
        let mut state = MarketState {
            apy_baseline: Some(10.0),
            ..Default::default()
        };
        let events = run(&mut state, None, Some(7.5));
        assert_eq!(events.len(), 1);
        assert_eq!(state.apy_baseline, Some(7.5));
    }

    #[test]
    fn missing_usd_value_leaves_episodes_untouched() {
        let mut state = MarketState {
            above_value_threshold: true,
            ..Default::default()
        };
        assert!(run(&mut state, None, None).is_empty());
        assert!(state.above_value_threshold);

        // Price recovers while still above: no duplicate notification.
        assert!(run(&mut state, Some(dec!(105)), None).is_empty());
    }

    #[test]
    fn value_and_size_rules_fire_independently() {
        let mut state = MarketState::default();
        let events = run(&mut state, Some(dec!(20_000)), None);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::HighValueOpportunity(_)));
        assert!(matches!(events[1], Event::LargeOrder(_)));
        assert!(state.above_size_threshold);
    }
}
