//! Summarization command implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use scry_core::{SummaryEngine, SummaryRequest, SummaryResponse, TimeRange};

use super::{load_source, parse_filter, parse_time_bound, split_names, truncate};

/// Parsed `scry summarize` arguments
pub struct SummarizeOptions {
    pub data: PathBuf,
    pub dataset: String,
    pub metric: String,
    pub dimensions: String,
    pub baseline_start: String,
    pub baseline_end: String,
    pub current_start: String,
    pub current_end: String,
    pub filters: Vec<String>,
    pub hierarchy: Option<String>,
    pub depth: usize,
    pub summary_size: usize,
    pub one_side_error: bool,
    pub exclude: Option<String>,
    pub time_zone: String,
    pub json: bool,
    pub time_column: String,
    pub value_column: String,
}

pub async fn cmd_summarize(options: SummarizeOptions) -> Result<()> {
    let source = load_source(
        &options.data,
        &options.dataset,
        &options.metric,
        &options.time_column,
        &options.value_column,
    )?;

    let baseline = TimeRange::new(
        parse_time_bound(&options.baseline_start)?,
        parse_time_bound(&options.baseline_end)?,
    );
    let current = TimeRange::new(
        parse_time_bound(&options.current_start)?,
        parse_time_bound(&options.current_end)?,
    );

    let mut request = SummaryRequest::new(&options.dataset, &options.metric)
        .with_windows(baseline, current)
        .with_dimensions(split_names(&options.dimensions))
        .with_depth(options.depth)
        .with_summary_size(options.summary_size)
        .with_one_side_error(options.one_side_error);
    request.time_zone = options.time_zone;

    for raw in &options.filters {
        let (dimension, value) = parse_filter(raw)?;
        request = request.with_filter(dimension, value);
    }
    if let Some(raw) = options.exclude.as_deref() {
        request = request.with_excluded(split_names(raw));
    }
    if let Some(raw) = options.hierarchy.as_deref() {
        request.hierarchies = serde_json::from_str(raw)
            .context("Invalid --hierarchy (expected a JSON array of name arrays)")?;
    }

    let engine = SummaryEngine::new(Arc::new(source));
    let response = engine.summarize(&request).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&response, baseline, current);
    }

    Ok(())
}

fn print_summary(response: &SummaryResponse, baseline: TimeRange, current: TimeRange) {
    println!();
    println!("🔍 Change Summary: {} / {}", response.dataset, response.metric);
    println!(
        "   Baseline: [{}, {})  Current: [{}, {})",
        baseline.start, baseline.end, current.start, current.end
    );
    if !response.dimensions.is_empty() {
        println!("   Dimensions: {}", response.dimensions.join(", "));
    }
    println!();
    println!(
        "   Global: {:.2} -> {:.2} ({})",
        response.global_baseline,
        response.global_current,
        format_change(response.global_baseline, response.global_current)
    );

    if response.entries.is_empty() {
        println!();
        println!("   No slice stands out; the change is diffuse or zero.");
        return;
    }

    println!(
        "   Explained by summary: {:.1}%",
        response.explained_fraction * 100.0
    );
    println!();
    println!(
        "   {:>2}  {:32} │ {:>10} │ {:>10} │ {:>8} │ {:>10}",
        "#", "Slice", "Baseline", "Current", "Change", "Cost"
    );
    println!("   ─────────────────────────────────────┼────────────┼────────────┼──────────┼────────────");

    for (rank, entry) in response.entries.iter().enumerate() {
        let change = entry
            .percentage_change
            .map(|p| format!("{:+.1}%", p * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "   {:>2}  {:32} │ {:>10.2} │ {:>10.2} │ {:>8} │ {:>10.2}",
            rank + 1,
            truncate(&entry.label(), 32),
            entry.baseline_value,
            entry.current_value,
            change,
            entry.cost
        );
    }
    println!();
}

fn format_change(baseline: f64, current: f64) -> String {
    if baseline == 0.0 {
        return "n/a".to_string();
    }
    format!("{:+.1}%", (current - baseline) / baseline * 100.0)
}
