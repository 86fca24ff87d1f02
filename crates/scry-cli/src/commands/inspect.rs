//! CSV source inspection command

use std::path::Path;

use anyhow::Result;
use chrono::DateTime;

use super::load_source;

pub fn cmd_inspect(data: &Path, time_column: &str, value_column: &str) -> Result<()> {
    // Dataset/metric names are irrelevant for inspection
    let source = load_source(data, "inspect", "inspect", time_column, value_column)?;

    println!();
    println!("📄 {}", data.display());
    println!("   Rows: {}", source.len());

    let dimensions = source.dimensions();
    if dimensions.is_empty() {
        println!("   Dimensions: (none)");
    } else {
        println!("   Dimensions: {}", dimensions.join(", "));
    }

    match source.time_span() {
        Some((earliest, latest)) => {
            println!(
                "   Time span: {} to {}",
                format_millis(earliest),
                format_millis(latest)
            );
        }
        None => println!("   Time span: (no rows)"),
    }
    println!();

    Ok(())
}

fn format_millis(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(datetime) => format!("{} ({})", millis, datetime.to_rfc3339()),
        None => millis.to_string(),
    }
}
