//! Terminal and JSON rendering shared by the commands.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Selected by the global `--json` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Success,
    Error,
    Warning,
    Info,
}

impl Mark {
    fn emit(self, message: &str) {
        let glyph = match self {
            Self::Success => "✓".green(),
            Self::Error => "✗".red(),
            Self::Warning => "⚠".yellow(),
            Self::Info => "ℹ".blue(),
        }
        .bold();
        match self {
            Self::Success | Self::Info => println!("{glyph} {message}"),
            Self::Error | Self::Warning => eprintln!("{glyph} {message}"),
        }
    }
}

pub fn success(message: &str) {
    Mark::Success.emit(message);
}

pub fn error(message: &str) {
    Mark::Error.emit(message);
}

/// Warnings go to stderr so `--json` output stays parseable.
pub fn warning(message: &str) {
    Mark::Warning.emit(message);
}

pub fn info(message: &str) {
    Mark::Info.emit(message);
}

/// Indented `key: value` line under a section.
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.bold(), value);
}

/// Print a section header.
pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Print a breaker state with a colored indicator.
pub fn breaker_status(label: &str, state: &str) {
    let indicator = match state {
        "closed" => "●".green(),
        "half_open" => "●".yellow(),
        _ => "●".red(),
    };
    println!("  {indicator} {label} ({state})");
}

/// Pretty JSON on stdout.
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Spinner on stderr while agents are answering; callers clear it before printing.
pub fn spinner(message: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::new_spinner().with_style(style).with_message(message.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}

pub fn table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("  (nothing to show)");
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

/// Format a duration as a human-readable string.
pub fn format_duration(duration: std::time::Duration) -> String {
    humantime::format_duration(duration).to_string()
}

/// Format a timestamp for listings.
pub fn format_timestamp(timestamp: chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a confidence in [0, 1] as a percentage.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Shorten text to at most `max` characters for table cells.
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Envelope for commands whose JSON output reports success or failure.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// JSON prints the whole envelope; text only reports an error, the
    /// caller renders `data` itself.
    pub fn print(&self, format: OutputFormat) -> anyhow::Result<()> {
        match (format, &self.error) {
            (OutputFormat::Json, _) => json(self),
            (OutputFormat::Text, Some(err)) => {
                error(err);
                Ok(())
            }
            (OutputFormat::Text, None) => Ok(()),
        }
    }
}
