//! Pluggable aggregate source abstraction
//!
//! The engine never fetches raw rows; it consumes per-dimension aggregate
//! sums through the `AggregateSource` trait. The production deployment backs
//! this with a query layer against the metric store; `MemorySource` provides
//! an in-process implementation for the CLI, the server, and tests.

mod memory;

pub use memory::{CsvSourceOptions, MemorySource};

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DimensionFilter, TimeRange};

/// Identifies which metric an aggregate query is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceScope {
    pub dataset: String,
    pub metric: String,
    /// IANA time zone id; windows arrive as epoch millis, so this is
    /// informational for sources that align data to calendar boundaries
    pub time_zone: String,
}

impl SourceScope {
    pub fn new(
        dataset: impl Into<String>,
        metric: impl Into<String>,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            metric: metric.into(),
            time_zone: time_zone.into(),
        }
    }
}

/// Trait defining the aggregate query contract
///
/// Implementations must be Send + Sync so fetches can run concurrently
/// across spawned tasks. Bounding of in-flight queries (connection pools,
/// semaphores) is the implementation's concern, not the engine's.
#[async_trait]
pub trait AggregateSource: Send + Sync {
    /// Sum the metric grouped by one dimension over a time range
    ///
    /// Returns a mapping from observed dimension value to the metric sum,
    /// restricted to rows matching all `filters` conjunctively.
    async fn aggregate(
        &self,
        scope: &SourceScope,
        dimension: &str,
        filters: &[DimensionFilter],
        range: TimeRange,
    ) -> Result<HashMap<String, f64>>;
}
