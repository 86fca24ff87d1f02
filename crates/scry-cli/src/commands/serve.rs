//! Server command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::load_source;

pub async fn cmd_serve(
    data: &Path,
    dataset: &str,
    metric: &str,
    host: &str,
    port: u16,
    time_column: &str,
    value_column: &str,
) -> Result<()> {
    let source = load_source(data, dataset, metric, time_column, value_column)?;

    println!("🚀 Starting Scry web server...");
    println!("   Source: {} ({} rows)", data.display(), source.len());
    println!("   Dataset/metric: {}/{}", dataset, metric);
    println!("   Listening: http://{}:{}", host, port);
    println!();
    println!("   Press Ctrl+C to stop");

    scry_server::serve(Arc::new(source), host, port).await?;

    Ok(())
}
