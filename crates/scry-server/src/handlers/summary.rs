//! Summarization handler

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use scry_core::{SummaryRequest, SummaryResponse};

/// Query parameters for the cube summary endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
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
    /// Comma-separated dimension names
    pub dimensions: String,
    /// JSON object of dimension -> value filters
    pub filters: Option<String>,
    pub summary_size: Option<usize>,
    pub depth: Option<usize>,
    /// JSON array of dimension-name arrays, outer-to-inner
    pub hierarchies: Option<String>,
    pub one_side_error: Option<bool>,
    /// Comma-separated dimension names to exclude
    pub excluded_dimensions: Option<String>,
    pub time_zone: Option<String>,
    pub metric_urn: Option<String>,
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// GET /api/cube/summary - Explain a metric change between two windows
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let mut request = SummaryRequest::new(params.dataset, params.metric)
        .with_windows(
            scry_core::TimeRange::new(params.baseline_start, params.baseline_end),
            scry_core::TimeRange::new(params.current_start, params.current_end),
        )
        .with_dimensions(split_names(&params.dimensions));

    request.metric_urn = params.metric_urn;
    if let Some(summary_size) = params.summary_size {
        request.summary_size = summary_size;
    }
    if let Some(depth) = params.depth {
        request.depth = depth;
    }
    if let Some(one_side_error) = params.one_side_error {
        request.one_side_error = one_side_error;
    }
    if let Some(raw) = params.excluded_dimensions.as_deref() {
        request.excluded_dimensions = split_names(raw);
    }
    if let Some(time_zone) = params.time_zone {
        request.time_zone = time_zone;
    }

    if let Some(raw) = params.filters.as_deref() {
        let filters: BTreeMap<String, String> = serde_json::from_str(raw).map_err(|_| {
            AppError::bad_request("Invalid filters (expected a JSON object of dimension:value)")
        })?;
        for (dimension, value) in filters {
            request = request.with_filter(dimension, value);
        }
    }

    if let Some(raw) = params.hierarchies.as_deref() {
        request.hierarchies = serde_json::from_str(raw).map_err(|_| {
            AppError::bad_request("Invalid hierarchies (expected a JSON array of name arrays)")
        })?;
    }

    let response = state
        .engine
        .summarize(&request)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(response))
}
