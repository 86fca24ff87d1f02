//! Direction filtering, greedy selection, and result assembly
//!
//! Selection is greedy in comparator order: a slice is accepted when it is
//! neither an ancestor nor a descendant of anything already accepted. The
//! cost model's size regularizer already penalizes redundant overlapping
//! explanations, so no exhaustive search is needed.

use tracing::debug;

use crate::models::{SummaryEntry, SummaryResponse};

use super::cost::compare_slices;
use super::{Cube, Slice};

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Select up to `summary_size` non-overlapping slices from a scored cube
///
/// Candidates are all level >= 1 slices with nonzero deviation. When
/// `one_side_error` is set, slices whose change direction disagrees with the
/// global direction are dropped first (zero-change slices are dropped
/// regardless, as uninformative). An empty selection is the legitimate
/// outcome for degenerate inputs, not an error.
pub fn select_slices(cube: &Cube, summary_size: usize, one_side_error: bool) -> Vec<&Slice> {
    let global_direction = sign(cube.global_change());

    let mut candidates: Vec<&Slice> = cube
        .explanatory_slices()
        .filter(|slice| slice.deviation != 0.0)
        .filter(|slice| {
            if !one_side_error {
                return true;
            }
            let direction = sign(slice.change());
            direction != 0 && direction == global_direction
        })
        .collect();
    candidates.sort_by(|a, b| compare_slices(a, b));

    let mut selected: Vec<&Slice> = Vec::new();
    for candidate in candidates {
        if selected.len() >= summary_size {
            break;
        }
        if selected
            .iter()
            .any(|accepted| accepted.key.is_related(&candidate.key))
        {
            continue;
        }
        selected.push(candidate);
    }

    debug!(selected = selected.len(), "Selected summary slices");
    selected
}

/// Package the selected slices into the response structure
pub fn assemble(
    metric_urn: Option<String>,
    dataset: String,
    metric: String,
    dimensions: Vec<String>,
    cube: &Cube,
    selected: &[&Slice],
) -> SummaryResponse {
    let global_baseline = cube.baseline_total();
    let global_current = cube.current_total();
    let global_change = global_current - global_baseline;

    let explained_fraction = if global_change == 0.0 {
        0.0
    } else {
        selected.iter().map(|s| s.deviation).sum::<f64>() / global_change
    };

    let entries = selected
        .iter()
        .map(|slice| {
            let change = slice.change();
            SummaryEntry {
                dimensions: slice.key.dimensions().map(String::from).collect(),
                values: slice.key.values().map(String::from).collect(),
                baseline_value: slice.baseline_value,
                current_value: slice.current_value,
                percentage_change: (slice.baseline_value != 0.0)
                    .then(|| change / slice.baseline_value),
                contribution_to_overall_change: (global_change != 0.0)
                    .then(|| change / global_change),
                cost: slice.cost,
            }
        })
        .collect();

    SummaryResponse {
        metric_urn,
        dataset,
        metric,
        dimensions,
        global_baseline,
        global_current,
        explained_fraction,
        entries,
    }
}
