//! Level-by-level cube construction
//!
//! The builder fetches aggregates through the source collaborator and grows
//! the cube one level at a time. Fetches within a level are issued
//! concurrently across spawned tasks and combined in a fixed order (parent
//! index, expansion order, value sort), so the resulting cube is identical
//! regardless of completion order.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::hierarchy::DimensionHierarchy;
use crate::models::{DimensionFilter, TimeRange};
use crate::source::{AggregateSource, SourceScope};

use super::{Cube, Slice, SliceKey};

/// Builds a `Cube` for one request
pub struct CubeBuilder<S> {
    source: Arc<S>,
    scope: SourceScope,
    hierarchy: DimensionHierarchy,
    filters: Vec<DimensionFilter>,
    baseline: TimeRange,
    current: TimeRange,
    depth: usize,
    max_slices_per_level: usize,
    max_total_slices: usize,
    additivity_tolerance: f64,
}

/// Merged per-value sums for one (parent, dimension) expansion
type ValueSums = BTreeMap<String, (f64, f64)>;

/// Baseline and current sums from one query pair
type WindowSums = (HashMap<String, f64>, HashMap<String, f64>);

impl<S: AggregateSource + 'static> CubeBuilder<S> {
    pub fn new(source: Arc<S>, scope: SourceScope, hierarchy: DimensionHierarchy) -> Self {
        Self {
            source,
            scope,
            hierarchy,
            filters: vec![],
            baseline: TimeRange::new(0, 0),
            current: TimeRange::new(0, 0),
            depth: 1,
            max_slices_per_level: 1000,
            max_total_slices: 100_000,
            additivity_tolerance: 1e-6,
        }
    }

    pub fn with_windows(mut self, baseline: TimeRange, current: TimeRange) -> Self {
        self.baseline = baseline;
        self.current = current;
        self
    }

    pub fn with_filters(mut self, filters: Vec<DimensionFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_caps(mut self, max_slices_per_level: usize, max_total_slices: usize) -> Self {
        self.max_slices_per_level = max_slices_per_level;
        self.max_total_slices = max_total_slices;
        self
    }

    pub fn with_additivity_tolerance(mut self, tolerance: f64) -> Self {
        self.additivity_tolerance = tolerance;
        self
    }

    /// Fetch aggregates and construct the cube up to the configured depth
    pub async fn build(&self) -> Result<Cube> {
        let order: Vec<String> = self.hierarchy.expansion_order().to_vec();
        if order.is_empty() {
            return Ok(Cube::new(0.0, 0.0));
        }

        // Level 1: one query pair per dimension, all concurrent
        let mut batch = FetchBatch::new();
        for dimension in &order {
            batch.push(self.spawn_fetch(dimension.clone(), self.filters.clone()));
        }

        let mut per_dimension: Vec<ValueSums> = Vec::with_capacity(order.len());
        while let Some(fetched) = batch.next().await {
            let (baseline_sums, current_sums) = fetched?;
            per_dimension.push(merge_windows(baseline_sums, current_sums));
        }

        // Global totals come from the first dimension's sums; every other
        // dimension is cross-checked against them (additive dataset
        // assumption, advisory on disagreement).
        let baseline_total: f64 = per_dimension[0].values().map(|(b, _)| b).sum();
        let current_total: f64 = per_dimension[0].values().map(|(_, c)| c).sum();
        for (dimension, sums) in order.iter().zip(per_dimension.iter()).skip(1) {
            let dim_baseline: f64 = sums.values().map(|(b, _)| b).sum();
            let dim_current: f64 = sums.values().map(|(_, c)| c).sum();
            if !self.within_tolerance(dim_baseline, baseline_total)
                || !self.within_tolerance(dim_current, current_total)
            {
                warn!(
                    dimension,
                    dim_baseline,
                    dim_current,
                    baseline_total,
                    current_total,
                    "Dimension sums disagree with global totals; dataset is not additive \
                     and results are advisory only"
                );
            }
        }

        let mut cube = Cube::new(baseline_total, current_total);

        // Level-1 slices exist only for dimensions without a hierarchy
        // parent; child dimensions enter at deeper levels under their parent.
        let mut slices = Vec::new();
        for (dimension, sums) in order.iter().zip(per_dimension.iter()) {
            if self.hierarchy.parent_of(dimension).is_some() {
                continue;
            }
            for (value, (baseline, current)) in sums {
                slices.push(Slice::new(
                    SliceKey::root().child(dimension, value),
                    *baseline,
                    *current,
                ));
            }
        }
        self.push_level(&mut cube, slices, 1)?;

        for level in 2..=self.depth {
            let slices = self.build_level(&cube, &order, level).await?;
            if slices.is_empty() {
                break;
            }
            self.push_level(&mut cube, slices, level)?;
        }

        Ok(cube)
    }

    /// Build level `level` slices from the previous level's slices
    ///
    /// A parent is only extended with dimensions that come after its last
    /// fixed dimension in expansion order, so every key set is constructed
    /// exactly once.
    async fn build_level(&self, cube: &Cube, order: &[String], level: usize) -> Result<Vec<Slice>> {
        let parents = &cube.levels()[level - 1];

        let mut expansions: Vec<(usize, String)> = Vec::new();
        let mut batch = FetchBatch::new();
        for (parent_index, parent) in parents.iter().enumerate() {
            let last_index = parent
                .key
                .last_dimension()
                .and_then(|d| self.hierarchy.order_index(d))
                .unwrap_or(0);
            for dimension in order.iter().skip(last_index + 1) {
                if let Some(required) = self.hierarchy.parent_of(dimension) {
                    if !parent.key.contains_dimension(required) {
                        continue;
                    }
                }
                let mut filters = self.filters.clone();
                filters.extend_from_slice(parent.key.as_filters());
                expansions.push((parent_index, dimension.clone()));
                batch.push(self.spawn_fetch(dimension.clone(), filters));
            }
        }

        let mut slices = Vec::new();
        for (parent_index, dimension) in expansions {
            let Some(fetched) = batch.next().await else { break };
            let (baseline_sums, current_sums) = fetched?;
            let parent = &parents[parent_index];
            let merged = merge_windows(baseline_sums, current_sums);

            // Children fixing one more dimension should sum back to their
            // parent (additive dataset assumption, advisory on disagreement)
            let child_baseline: f64 = merged.values().map(|(b, _)| b).sum();
            let child_current: f64 = merged.values().map(|(_, c)| c).sum();
            if !self.within_tolerance(child_baseline, parent.baseline_value)
                || !self.within_tolerance(child_current, parent.current_value)
            {
                warn!(
                    parent = ?parent.key.canonical(),
                    dimension = %dimension,
                    child_baseline,
                    child_current,
                    parent_baseline = parent.baseline_value,
                    parent_current = parent.current_value,
                    "Child sums disagree with their parent slice; dataset is not \
                     additive and results are advisory only"
                );
            }

            for (value, (baseline, current)) in merged {
                slices.push(Slice::new(
                    parent.key.child(&dimension, value),
                    baseline,
                    current,
                ));
            }
        }
        Ok(slices)
    }

    /// Apply the per-level cap, enforce the hard ceiling, append the level
    fn push_level(&self, cube: &mut Cube, mut slices: Vec<Slice>, level: usize) -> Result<()> {
        if slices.len() > self.max_slices_per_level {
            warn!(
                level,
                candidates = slices.len(),
                cap = self.max_slices_per_level,
                "Dropping lowest-magnitude slices to respect per-level cap"
            );
            slices.sort_by(|a, b| {
                b.change()
                    .abs()
                    .total_cmp(&a.change().abs())
                    .then_with(|| a.key.cmp_canonical(&b.key))
            });
            slices.truncate(self.max_slices_per_level);
        }

        debug!(level, slices = slices.len(), "Built cube level");
        cube.push_level(slices);

        let total = cube.total_slices();
        if total > self.max_total_slices {
            return Err(Error::CubeOverflow {
                slices: total,
                limit: self.max_total_slices,
            });
        }
        Ok(())
    }

    /// Spawn one concurrent baseline/current query pair
    fn spawn_fetch(
        &self,
        dimension: String,
        filters: Vec<DimensionFilter>,
    ) -> JoinHandle<Result<WindowSums>> {
        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        let baseline = self.baseline;
        let current = self.current;
        tokio::spawn(async move {
            let (baseline_sums, current_sums) = tokio::join!(
                source.aggregate(&scope, &dimension, &filters, baseline),
                source.aggregate(&scope, &dimension, &filters, current),
            );
            Ok((baseline_sums?, current_sums?))
        })
    }

    fn within_tolerance(&self, actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= self.additivity_tolerance * expected.abs().max(1.0)
    }
}

/// Fetch tasks for one level, awaited in spawn order
///
/// Tasks still in the batch are aborted on drop, so a failed fetch or an
/// expired request deadline also cancels the queries still in flight.
struct FetchBatch {
    tasks: VecDeque<JoinHandle<Result<WindowSums>>>,
}

impl FetchBatch {
    fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    fn push(&mut self, task: JoinHandle<Result<WindowSums>>) {
        self.tasks.push_back(task);
    }

    /// Await the next task in spawn order
    async fn next(&mut self) -> Option<Result<WindowSums>> {
        let task = self.tasks.pop_front()?;
        Some(await_fetch(task).await)
    }
}

impl Drop for FetchBatch {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Await a fetch task, mapping failures to `DataUnavailable`
async fn await_fetch(task: JoinHandle<Result<WindowSums>>) -> Result<WindowSums> {
    let joined = task
        .await
        .map_err(|e| Error::DataUnavailable(format!("aggregate task failed: {}", e)))?;
    joined.map_err(|e| match e {
        Error::DataUnavailable(_) => e,
        other => Error::DataUnavailable(other.to_string()),
    })
}

/// Merge baseline and current sums per value, pruning values with no
/// contribution in either window
fn merge_windows(baseline: HashMap<String, f64>, current: HashMap<String, f64>) -> ValueSums {
    let mut merged: ValueSums = BTreeMap::new();
    for (value, sum) in baseline {
        merged.entry(value).or_insert((0.0, 0.0)).0 = sum;
    }
    for (value, sum) in current {
        merged.entry(value).or_insert((0.0, 0.0)).1 = sum;
    }
    merged.retain(|_, (b, c)| *b != 0.0 || *c != 0.0);
    merged
}
