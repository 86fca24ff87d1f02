//! Summarization engine
//!
//! Orchestrates one request end to end: validate, resolve the hierarchy,
//! build the cube under a single deadline, score, filter, select, assemble.
//! The engine holds no per-request state; every cube lives only for the
//! duration of one call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::info;

use crate::cube::cost::score_cube;
use crate::cube::summary::{assemble, select_slices};
use crate::cube::CubeBuilder;
use crate::error::{Error, Result};
use crate::hierarchy::DimensionHierarchy;
use crate::models::{SummaryRequest, SummaryResponse};
use crate::source::{AggregateSource, SourceScope};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Candidate cap per cube level; lowest-magnitude candidates are dropped
    /// deterministically when exceeded
    pub max_slices_per_level: usize,
    /// Hard ceiling on total slices; exceeding it fails with `CubeOverflow`
    pub max_total_slices: usize,
    /// Single deadline covering all aggregate fetches for one request
    pub fetch_timeout: Duration,
    /// Logarithm base of the cost regularizer
    pub cost_log_base: f64,
    /// Relative tolerance for the additive-dataset cross-check
    pub additivity_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_slices_per_level: 1000,
            max_total_slices: 100_000,
            fetch_timeout: Duration::from_secs(30),
            cost_log_base: std::f64::consts::E,
            additivity_tolerance: 1e-6,
        }
    }
}

/// The root-cause summarization engine
pub struct SummaryEngine<S> {
    source: Arc<S>,
    config: EngineConfig,
}

impl<S: AggregateSource + 'static> SummaryEngine<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(source: Arc<S>, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Explain why the metric changed between the baseline and current window
    ///
    /// Degenerate inputs (zero global change, nothing above the noise floor)
    /// produce a valid empty response with `explained_fraction = 0`; only
    /// configuration, data-availability, and overflow problems are errors.
    pub async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse> {
        request.validate()?;

        let dimensions = request.unique_dimensions();
        let excluded: HashSet<String> = request.excluded_dimensions.iter().cloned().collect();
        let hierarchy = DimensionHierarchy::resolve(&request.hierarchies, &dimensions, &excluded)?;
        let analyzed = hierarchy.expansion_order().to_vec();

        info!(
            dataset = %request.dataset,
            metric = %request.metric,
            dimensions = analyzed.len(),
            depth = request.depth,
            baseline_start = request.baseline_start,
            baseline_end = request.baseline_end,
            current_start = request.current_start,
            current_end = request.current_end,
            "Summarizing metric change"
        );

        let scope = SourceScope::new(&request.dataset, &request.metric, &request.time_zone);
        let builder = CubeBuilder::new(Arc::clone(&self.source), scope, hierarchy)
            .with_windows(request.baseline_range(), request.current_range())
            .with_filters(request.filters.clone())
            .with_depth(request.depth)
            .with_caps(
                self.config.max_slices_per_level,
                self.config.max_total_slices,
            )
            .with_additivity_tolerance(self.config.additivity_tolerance);

        let mut cube = timeout(self.config.fetch_timeout, builder.build())
            .await
            .map_err(|_| {
                Error::DataUnavailable(format!(
                    "aggregate fetches exceeded the {:?} deadline",
                    self.config.fetch_timeout
                ))
            })??;

        score_cube(&mut cube, self.config.cost_log_base);
        let selected = select_slices(&cube, request.summary_size, request.one_side_error);
        let response = assemble(
            request.metric_urn.clone(),
            request.dataset.clone(),
            request.metric.clone(),
            analyzed,
            &cube,
            &selected,
        );

        info!(
            entries = response.entries.len(),
            explained_fraction = response.explained_fraction,
            global_baseline = response.global_baseline,
            global_current = response.global_current,
            "Summarization complete"
        );
        Ok(response)
    }
}
