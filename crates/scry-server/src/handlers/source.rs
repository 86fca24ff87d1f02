//! Source description and liveness handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};

/// Description of the loaded aggregate source
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub dataset: String,
    pub metric: String,
    pub rows: usize,
    pub dimensions: Vec<String>,
    /// Earliest row timestamp (epoch millis), if any rows are loaded
    pub earliest: Option<i64>,
    /// Latest row timestamp (epoch millis), if any rows are loaded
    pub latest: Option<i64>,
}

/// GET /api/source - Describe the loaded source
pub async fn get_source_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourceInfo>, AppError> {
    let span = state.source.time_span();
    Ok(Json(SourceInfo {
        dataset: state.source.dataset().to_string(),
        metric: state.source.metric().to_string(),
        rows: state.source.len(),
        dimensions: state.source.dimensions(),
        earliest: span.map(|(start, _)| start),
        latest: span.map(|(_, end)| end),
    }))
}

/// GET /api/health - Liveness check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
