//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `inspect` - CSV source description command
//! - `serve` - Web server command
//! - `summarize` - Summarization command (table and JSON output)

pub mod inspect;
pub mod serve;
pub mod summarize;

// Re-export command functions for main.rs
pub use inspect::*;
pub use serve::*;
pub use summarize::*;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use scry_core::{CsvSourceOptions, MemorySource};

/// Parse a time bound as epoch millis or a `YYYY-MM-DD` date at UTC midnight
pub fn parse_time_bound(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid time bound '{}' (use epoch millis or YYYY-MM-DD)", raw))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
        .timestamp_millis())
}

/// Parse a `dimension=value` filter argument
pub fn parse_filter(raw: &str) -> Result<(String, String)> {
    let (dimension, value) = raw
        .split_once('=')
        .with_context(|| format!("Invalid filter '{}' (use dimension=value)", raw))?;
    if dimension.trim().is_empty() {
        anyhow::bail!("Invalid filter '{}' (dimension name is empty)", raw);
    }
    Ok((dimension.trim().to_string(), value.trim().to_string()))
}

/// Split a comma-separated list of names, dropping empty entries
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load a CSV file into an in-memory aggregate source
pub fn load_source(
    path: &Path,
    dataset: &str,
    metric: &str,
    time_column: &str,
    value_column: &str,
) -> Result<MemorySource> {
    let options = CsvSourceOptions {
        time_column: time_column.to_string(),
        value_column: value_column.to_string(),
    };
    MemorySource::from_csv_path(path, dataset, metric, &options)
        .with_context(|| format!("Failed to load {}", path.display()))
}

/// Truncate a string to at most `max` characters, adding "..." if truncated
///
/// Counts characters rather than bytes so multi-byte labels never split
/// mid-character.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
