//! Output formatting utilities.

use colored::Colorize;
use keel_core::Weights;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::cli::OutputFormat;

/// Prints a titled metric table, or `data` itself as JSON.
pub fn print_report<T: Serialize>(
    title: &str,
    rows: &[KeyValue],
    data: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            print_header(title);
            print_table(rows)
        }
        OutputFormat::Json => print_json(data),
    }
}

/// Prints data as a formatted table.
pub fn print_table<T: Tabled>(data: &[T]) -> anyhow::Result<()> {
    if data.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let table = Table::new(data)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string();

    println!("{}", table);
    Ok(())
}

/// Prints data as JSON.
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Prints a section header.
pub fn print_header(title: &str) {
    println!("\n{}\n", title.bold().underline());
}

/// Formats a fraction as a percentage string.
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", value * Decimal::from(100))
}

/// Formats a money amount with cents.
pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Formats weights as `SYM 60.00%, SYM 40.00%`.
pub fn format_weights(weights: &Weights) -> String {
    weights
        .iter()
        .map(|(symbol, weight)| format!("{symbol} {}", format_percent(*weight)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A key-value pair for display.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct KeyValue {
    #[tabled(rename = "Metric")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }

    /// Creates a key-value pair from a money amount.
    pub fn from_money(key: impl Into<String>, value: Decimal) -> Self {
        Self::new(key, format_money(value))
    }

    /// Creates a key-value pair from a ratio, with fixed precision.
    pub fn from_f64(key: impl Into<String>, value: f64, precision: usize) -> Self {
        Self::new(key, format!("{:.prec$}", value, prec = precision))
    }
}
