//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Scry - Explain why a metric changed
#[derive(Parser)]
#[command(name = "scry")]
#[command(about = "Multi-dimensional root-cause summarizer for metric changes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Explain a metric change between a baseline and a current window
    Summarize {
        /// CSV file with metric rows (time, value, one column per dimension)
        #[arg(long)]
        data: PathBuf,

        /// Dataset name the rows belong to
        #[arg(long)]
        dataset: String,

        /// Metric name the value column holds
        #[arg(long)]
        metric: String,

        /// Comma-separated dimensions to analyze
        #[arg(long)]
        dimensions: String,

        /// Baseline window start (epoch millis or YYYY-MM-DD, UTC midnight)
        #[arg(long)]
        baseline_start: String,

        /// Baseline window end, exclusive
        #[arg(long)]
        baseline_end: String,

        /// Current window start
        #[arg(long)]
        current_start: String,

        /// Current window end, exclusive
        #[arg(long)]
        current_end: String,

        /// Restrict the analysis to rows matching dim=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Hierarchy paths as a JSON array of name arrays, outer-to-inner
        /// (e.g. '[["continent","country"]]')
        #[arg(long)]
        hierarchy: Option<String>,

        /// Maximum number of dimensions combined in one slice
        #[arg(long, default_value = "3")]
        depth: usize,

        /// Maximum number of slices in the summary
        #[arg(long, default_value = "4")]
        summary_size: usize,

        /// Only keep slices that moved with the global change
        #[arg(long)]
        one_side_error: bool,

        /// Comma-separated dimensions to exclude from every slice
        #[arg(long)]
        exclude: Option<String>,

        /// IANA time zone id
        #[arg(long, default_value = "UTC")]
        time_zone: String,

        /// Print the raw JSON response instead of a table
        #[arg(long)]
        json: bool,

        /// CSV column holding the row timestamp
        #[arg(long, default_value = "timestamp")]
        time_column: String,

        /// CSV column holding the metric value
        #[arg(long, default_value = "value")]
        value_column: String,
    },

    /// Start the web server over a CSV source
    Serve {
        /// CSV file with metric rows
        #[arg(long)]
        data: PathBuf,

        /// Dataset name the rows belong to
        #[arg(long)]
        dataset: String,

        /// Metric name the value column holds
        #[arg(long)]
        metric: String,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// CSV column holding the row timestamp
        #[arg(long, default_value = "timestamp")]
        time_column: String,

        /// CSV column holding the metric value
        #[arg(long, default_value = "value")]
        value_column: String,
    },

    /// Describe a CSV source (rows, dimensions, time span)
    Inspect {
        /// CSV file with metric rows
        #[arg(long)]
        data: PathBuf,

        /// CSV column holding the row timestamp
        #[arg(long, default_value = "timestamp")]
        time_column: String,

        /// CSV column holding the metric value
        #[arg(long, default_value = "value")]
        value_column: String,
    },
}
