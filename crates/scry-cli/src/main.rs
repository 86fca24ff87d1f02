//! Scry CLI - Multi-dimensional root-cause summarizer
//!
//! Usage:
//!   scry summarize --data rows.csv ...   Explain a metric change
//!   scry serve --data rows.csv ...       Start web server
//!   scry inspect --data rows.csv         Describe a CSV source

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use commands::SummarizeOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Summarize {
            data,
            dataset,
            metric,
            dimensions,
            baseline_start,
            baseline_end,
            current_start,
            current_end,
            filters,
            hierarchy,
            depth,
            summary_size,
            one_side_error,
            exclude,
            time_zone,
            json,
            time_column,
            value_column,
        } => {
            commands::cmd_summarize(SummarizeOptions {
                data,
                dataset,
                metric,
                dimensions,
                baseline_start,
                baseline_end,
                current_start,
                current_end,
                filters,
                hierarchy,
                depth,
                summary_size,
                one_side_error,
                exclude,
                time_zone,
                json,
                time_column,
                value_column,
            })
            .await
        }
        Commands::Serve {
            data,
            dataset,
            metric,
            host,
            port,
            time_column,
            value_column,
        } => {
            commands::cmd_serve(
                &data,
                &dataset,
                &metric,
                &host,
                port,
                &time_column,
                &value_column,
            )
            .await
        }
        Commands::Inspect {
            data,
            time_column,
            value_column,
        } => commands::cmd_inspect(&data, &time_column, &value_column),
    }
}
