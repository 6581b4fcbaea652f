//! Rendering for one-shot composite quotes.

use tabled::{Table, Tabled};

use crate::cli::output;
use crate::domain::{CompositeQuote, QuoteResult};

#[derive(Tabled)]
struct QuoteRow {
    #[tabled(rename = "Aggregator")]
    aggregator: String,
    #[tabled(rename = "Amount (YT)")]
    amount: String,
    #[tabled(rename = "Value (USD)")]
    usd: String,
    #[tabled(rename = "Effective APY")]
    effective_apy: String,
    #[tabled(rename = "Implied APY")]
    implied_apy: String,
    #[tabled(rename = "Price Impact")]
    price_impact: String,
}

fn row(quote: &QuoteResult) -> QuoteRow {
    QuoteRow {
        aggregator: quote.aggregator.clone(),
        amount: format!("{:.6}", quote.amount),
        usd: quote
            .usd_value
            .map_or_else(|| "unavailable".to_string(), |v| format!("{v:.2}")),
        effective_apy: percent(quote.effective_apy),
        implied_apy: percent(quote.implied_apy),
        price_impact: quote
            .price_impact
            .map_or_else(|| "unavailable".to_string(), |p| format!("{:.4}%", p * 100.0)),
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "unavailable".to_string(), |v| format!("{v:.2}%"))
}

/// Print a full composite quote: the ranked table plus failed aggregators.
pub fn print(composite: &CompositeQuote) {
    output::section(&format!("Quotes for {}", composite.market));
    output::key_value("Quoted at", composite.quoted_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    if composite.is_empty() {
        output::warn("no aggregator returned a usable quote");
    } else {
        let table = Table::new(composite.quotes.iter().map(row)).to_string();
        for line in table.lines() {
            println!("  {line}");
        }
        if let Some(best) = composite.best() {
            println!();
            output::key_value("Best route", output::highlight(&best.aggregator));
        }
    }

    for failure in &composite.failures {
        output::warn(&format!("{}: {}", failure.aggregator, failure.error));
    }
    println!();
}
