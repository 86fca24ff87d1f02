//! Domain models for Scry

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A half-open time window `[start, end)` in epoch milliseconds UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn duration_millis(&self) -> i64 {
        self.end - self.start
    }
}

/// A conjunctive `dimension = value` predicate
///
/// Used both for caller-supplied request filters and for pushing a parent
/// slice's assignments down to the aggregate source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub dimension: String,
    pub value: String,
}

impl DimensionFilter {
    pub fn new(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for DimensionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.dimension, self.value)
    }
}

fn default_summary_size() -> usize {
    4
}

fn default_depth() -> usize {
    3
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// A summarization request
///
/// Describes which metric changed, the baseline and current windows, and how
/// the change may be broken down (dimensions, hierarchy, depth, exclusions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Optional metric URN carried through to the response as metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_urn: Option<String>,
    pub dataset: String,
    pub metric: String,
    /// Current window start (epoch millis, inclusive)
    pub current_start: i64,
    /// Current window end (epoch millis, exclusive)
    pub current_end: i64,
    /// Baseline window start (epoch millis, inclusive)
    pub baseline_start: i64,
    /// Baseline window end (epoch millis, exclusive)
    pub baseline_end: i64,
    /// Ordered set of dimensions to break the change down by
    pub dimensions: Vec<String>,
    /// Conjunctive filters applied to every aggregate query
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
    /// Maximum number of slices in the summary
    #[serde(default = "default_summary_size")]
    pub summary_size: usize,
    /// Maximum number of dimensions fixed simultaneously in a slice
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Dimension hierarchy paths, outer-to-inner
    #[serde(default)]
    pub hierarchies: Vec<Vec<String>>,
    /// Only keep slices that moved in the same direction as the global change
    #[serde(default)]
    pub one_side_error: bool,
    /// Dimensions that must never appear in a slice
    #[serde(default)]
    pub excluded_dimensions: Vec<String>,
    /// IANA time zone id, carried to the source scope
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

impl SummaryRequest {
    pub fn new(dataset: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            metric_urn: None,
            dataset: dataset.into(),
            metric: metric.into(),
            current_start: 0,
            current_end: 0,
            baseline_start: 0,
            baseline_end: 0,
            dimensions: vec![],
            filters: vec![],
            summary_size: default_summary_size(),
            depth: default_depth(),
            hierarchies: vec![],
            one_side_error: false,
            excluded_dimensions: vec![],
            time_zone: default_time_zone(),
        }
    }

    pub fn with_windows(mut self, baseline: TimeRange, current: TimeRange) -> Self {
        self.baseline_start = baseline.start;
        self.baseline_end = baseline.end;
        self.current_start = current.start;
        self.current_end = current.end;
        self
    }

    pub fn with_dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions = dimensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(DimensionFilter::new(dimension, value));
        self
    }

    pub fn with_hierarchy<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hierarchies
            .push(path.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_summary_size(mut self, summary_size: usize) -> Self {
        self.summary_size = summary_size;
        self
    }

    pub fn with_one_side_error(mut self, one_side_error: bool) -> Self {
        self.one_side_error = one_side_error;
        self
    }

    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dimensions = excluded.into_iter().map(Into::into).collect();
        self
    }

    pub fn baseline_range(&self) -> TimeRange {
        TimeRange::new(self.baseline_start, self.baseline_end)
    }

    pub fn current_range(&self) -> TimeRange {
        TimeRange::new(self.current_start, self.current_end)
    }

    /// Validate the request before any fetch is issued
    ///
    /// Every rejection here is an `InvalidConfiguration` with no partial work.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(Error::InvalidConfiguration("dataset is required".into()));
        }
        if self.metric.trim().is_empty() {
            return Err(Error::InvalidConfiguration("metric is required".into()));
        }
        if self.depth < 1 {
            return Err(Error::InvalidConfiguration("depth must be >= 1".into()));
        }
        if self.summary_size < 1 {
            return Err(Error::InvalidConfiguration(
                "summarySize must be >= 1".into(),
            ));
        }
        if self.current_end <= self.current_start {
            return Err(Error::InvalidConfiguration(
                "current window end must be after start".into(),
            ));
        }
        if self.baseline_end <= self.baseline_start {
            return Err(Error::InvalidConfiguration(
                "baseline window end must be after start".into(),
            ));
        }
        if self.time_zone.trim().is_empty() {
            return Err(Error::InvalidConfiguration("timeZone is required".into()));
        }
        for excluded in &self.excluded_dimensions {
            if self.dimensions.iter().any(|d| d == excluded) {
                return Err(Error::InvalidConfiguration(format!(
                    "dimension '{}' is both grouped by and excluded",
                    excluded
                )));
            }
        }
        Ok(())
    }

    /// Dimensions with duplicates removed, preserving first occurrence
    pub fn unique_dimensions(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.dimensions
            .iter()
            .filter(|d| seen.insert(d.as_str()))
            .cloned()
            .collect()
    }
}

/// One selected slice in the summary, annotated for the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    /// Dimension names fixed in this slice, in expansion order
    pub dimensions: Vec<String>,
    /// Values for the fixed dimensions, parallel to `dimensions`
    pub values: Vec<String>,
    pub baseline_value: f64,
    pub current_value: f64,
    /// `(current - baseline) / baseline`; null when the baseline is zero
    pub percentage_change: Option<f64>,
    /// Share of the global change; null when the global change is zero
    pub contribution_to_overall_change: Option<f64>,
    pub cost: f64,
}

impl SummaryEntry {
    /// Human-readable `dim=value` label, e.g. `country=US, device=mobile`
    pub fn label(&self) -> String {
        self.dimensions
            .iter()
            .zip(self.values.iter())
            .map(|(d, v)| format!("{}={}", d, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The full result of a summarization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_urn: Option<String>,
    pub dataset: String,
    pub metric: String,
    /// Dimensions actually analyzed, in expansion order
    pub dimensions: Vec<String>,
    pub global_baseline: f64,
    pub global_current: f64,
    /// Fraction of the global change accounted for by the entries
    ///
    /// Low values signal a diffuse change rather than a localized one.
    pub explained_fraction: f64,
    pub entries: Vec<SummaryEntry>,
}
