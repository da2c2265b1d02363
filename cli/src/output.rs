//! Output formatting

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Print `data` as JSON, or run `text` for the human-readable form
    pub fn print<T: Serialize>(&self, data: &T, text: impl FnOnce()) {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
            OutputFormat::Text => text(),
        }
    }
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn field(key: &str, value: impl std::fmt::Display) {
    println!("  {:<12} {}", format!("{key}:").dimmed(), value);
}
