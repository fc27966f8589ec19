//! Table and JSON rendering for command results.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print rows in the selected format
pub fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("(none)"),
        OutputFormat::Table => {
            let mut table = Table::new(rows);
            table.with(Style::sharp());
            println!("{table}");
        }
        OutputFormat::Json => print_json(&rows),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => print_error(&format!("could not encode output: {e}")),
    }
}

/// Print an allow/deny style verdict line
pub fn print_verdict(granted: bool, msg: &str) {
    let mark = if granted { '✓' } else { '✗' };
    println!("{mark} {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("error: {msg}");
}

/// Print an indented key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<28} {value}", format!("{key}:"));
}
