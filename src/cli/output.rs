//! Terminal output helpers for the one-shot commands.

use std::fmt::Display;

use owo_colors::OwoColorize;

/// Section title with an underline rule sized to the title.
pub fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(title.chars().count().max(40)));
}

/// Aligned label/value pair.
pub fn key_value(label: &str, value: impl Display) {
    println!("{label:<16} {value}");
}

pub fn warn(message: &str) {
    println!("⚠ {message}");
}

pub fn error(message: &str) {
    eprintln!("✗ {message}");
}

/// Cyan-highlighted value for the line that matters most.
pub fn highlight(value: impl Display) -> String {
    format!("{}", value.to_string().cyan())
}
