//! In-memory aggregate source
//!
//! Holds metric rows (timestamp, value, dimension assignments) and answers
//! aggregate queries by scanning them. Rows can be added programmatically or
//! loaded from a CSV file with one column per dimension.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{DimensionFilter, TimeRange};

use super::{AggregateSource, SourceScope};

/// One metric observation
#[derive(Debug, Clone)]
struct Row {
    timestamp: i64,
    value: f64,
    dimensions: HashMap<String, String>,
}

/// Options for loading rows from CSV
#[derive(Debug, Clone)]
pub struct CsvSourceOptions {
    /// Column holding the row timestamp (epoch millis, RFC 3339, or YYYY-MM-DD)
    pub time_column: String,
    /// Column holding the metric value
    pub value_column: String,
}

impl Default for CsvSourceOptions {
    fn default() -> Self {
        Self {
            time_column: "timestamp".to_string(),
            value_column: "value".to_string(),
        }
    }
}

/// In-memory implementation of `AggregateSource`
#[derive(Debug)]
pub struct MemorySource {
    dataset: String,
    metric: String,
    rows: Vec<Row>,
}

impl MemorySource {
    pub fn new(dataset: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            metric: metric.into(),
            rows: Vec::new(),
        }
    }

    /// Add one row with dimension assignments as (name, value) pairs
    pub fn add_row<I, K, V>(&mut self, timestamp: i64, value: f64, dimensions: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.rows.push(Row {
            timestamp,
            value,
            dimensions: dimensions
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
    }

    /// Load rows from a CSV file
    ///
    /// Every column other than the time and value columns is treated as a
    /// dimension. Empty dimension cells are skipped for that row.
    pub fn from_csv_path(
        path: impl AsRef<Path>,
        dataset: impl Into<String>,
        metric: impl Into<String>,
        options: &CsvSourceOptions,
    ) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv(file, dataset, metric, options)
    }

    /// Load rows from CSV data
    pub fn from_csv<R: Read>(
        reader: R,
        dataset: impl Into<String>,
        metric: impl Into<String>,
        options: &CsvSourceOptions,
    ) -> Result<Self> {
        let mut source = Self::new(dataset, metric);
        let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let time_index = headers
            .iter()
            .position(|h| h == options.time_column)
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "CSV is missing time column '{}'",
                    options.time_column
                ))
            })?;
        let value_index = headers
            .iter()
            .position(|h| h == options.value_column)
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "CSV is missing value column '{}'",
                    options.value_column
                ))
            })?;

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let raw_time = record.get(time_index).unwrap_or_default();
            let timestamp = parse_timestamp(raw_time).ok_or_else(|| {
                Error::InvalidConfiguration(format!(
                    "row {}: unparseable timestamp '{}'",
                    line + 1,
                    raw_time
                ))
            })?;
            let raw_value = record.get(value_index).unwrap_or_default();
            let value: f64 = raw_value.trim().parse().map_err(|_| {
                Error::InvalidConfiguration(format!(
                    "row {}: unparseable value '{}'",
                    line + 1,
                    raw_value
                ))
            })?;

            let dimensions: HashMap<String, String> = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != time_index && *i != value_index)
                .filter_map(|(i, header)| {
                    record
                        .get(i)
                        .filter(|v| !v.is_empty())
                        .map(|v| (header.to_string(), v.to_string()))
                })
                .collect();

            source.rows.push(Row {
                timestamp,
                value,
                dimensions,
            });
        }

        debug!(rows = source.rows.len(), "Loaded CSV source");
        Ok(source)
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dimension names observed across all rows, sorted
    pub fn dimensions(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .rows
            .iter()
            .flat_map(|r| r.dimensions.keys().map(String::as_str))
            .collect();
        names.into_iter().map(String::from).collect()
    }

    /// Earliest and latest row timestamps, if any rows are loaded
    pub fn time_span(&self) -> Option<(i64, i64)> {
        let min = self.rows.iter().map(|r| r.timestamp).min()?;
        let max = self.rows.iter().map(|r| r.timestamp).max()?;
        Some((min, max))
    }

    fn matches(&self, row: &Row, filters: &[DimensionFilter], range: TimeRange) -> bool {
        range.contains(row.timestamp)
            && filters
                .iter()
                .all(|f| row.dimensions.get(&f.dimension).map(String::as_str) == Some(&f.value))
    }
}

/// Parse a timestamp as epoch millis, RFC 3339, or a date at UTC midnight
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Some(millis);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

#[async_trait]
impl AggregateSource for MemorySource {
    async fn aggregate(
        &self,
        scope: &SourceScope,
        dimension: &str,
        filters: &[DimensionFilter],
        range: TimeRange,
    ) -> Result<HashMap<String, f64>> {
        if scope.dataset != self.dataset || scope.metric != self.metric {
            return Err(Error::DataUnavailable(format!(
                "source holds {}/{}, not {}/{}",
                self.dataset, self.metric, scope.dataset, scope.metric
            )));
        }

        let mut sums: HashMap<String, f64> = HashMap::new();
        for row in &self.rows {
            if !self.matches(row, filters, range) {
                continue;
            }
            if let Some(value) = row.dimensions.get(dimension) {
                *sums.entry(value.clone()).or_insert(0.0) += row.value;
            }
        }
        Ok(sums)
    }
}
