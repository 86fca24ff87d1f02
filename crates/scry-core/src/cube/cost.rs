//! Slice scoring
//!
//! Each slice is scored by how much of its change is *not* explained by the
//! metric changing uniformly everywhere, regularized by slice size so that
//! tiny noisy slices are discounted even when their percentage change is
//! extreme. The exact coefficients are tunable; the shape is
//! `|deviation| * log(1 + |baseline|)`.

use std::cmp::Ordering;

use super::{Cube, Slice};

/// Compute deviation and cost for every slice in the cube
///
/// With `r = global_current / global_baseline`:
/// - `expected_current = baseline * r`, falling back to the slice's own
///   current value when the global baseline is zero (no division, and the
///   slice is treated as fully explained by itself)
/// - `deviation = current - expected_current`
/// - `cost = |deviation| * log(1 + |baseline|)` in the configured base
///
/// The root slice always keeps deviation and cost at zero; it is never a
/// summary entry.
pub fn score_cube(cube: &mut Cube, log_base: f64) {
    let global_baseline = cube.baseline_total();
    let global_current = cube.current_total();
    let log_scale = log_base.ln();

    for slice in cube.slices_mut() {
        if slice.key.is_root() {
            slice.deviation = 0.0;
            slice.cost = 0.0;
            continue;
        }
        let expected_current = if global_baseline == 0.0 {
            slice.current_value
        } else {
            slice.baseline_value * (global_current / global_baseline)
        };
        slice.deviation = slice.current_value - expected_current;
        slice.cost =
            slice.deviation.abs() * (1.0 + slice.baseline_value.abs()).ln() / log_scale;
    }
}

/// The single total order used for both selection and output
///
/// Cost descending, then smaller level (prefer simpler explanations), then
/// absolute change descending, then lexicographically smaller canonical key.
pub fn compare_slices(a: &Slice, b: &Slice) -> Ordering {
    b.cost
        .total_cmp(&a.cost)
        .then_with(|| a.level().cmp(&b.level()))
        .then_with(|| b.change().abs().total_cmp(&a.change().abs()))
        .then_with(|| a.key.cmp_canonical(&b.key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::SliceKey;

    fn slice(dimension: &str, value: &str, baseline: f64, current: f64) -> Slice {
        Slice::new(SliceKey::root().child(dimension, value), baseline, current)
    }

    #[test]
    fn test_score_cube_deviation_against_uniform_growth() {
        // Global 150 -> 190, ratio ~1.2667
        let mut cube = Cube::new(150.0, 190.0);
        cube.push_level(vec![
            slice("country", "US", 100.0, 150.0),
            slice("country", "UK", 50.0, 40.0),
        ]);
        score_cube(&mut cube, std::f64::consts::E);

        let level1 = &cube.levels()[1];
        let us = &level1[0];
        let uk = &level1[1];

        // US expected 126.67, actual 150: positive deviation
        assert!((us.deviation - (150.0 - 100.0 * 190.0 / 150.0)).abs() < 1e-9);
        assert!(us.deviation > 0.0);
        // UK expected 63.33, actual 40: negative deviation
        assert!(uk.deviation < 0.0);

        assert!((us.cost - us.deviation.abs() * 101.0_f64.ln()).abs() < 1e-9);
        assert!(us.cost > uk.cost);
    }

    #[test]
    fn test_score_cube_zero_global_baseline_fallback() {
        let mut cube = Cube::new(0.0, 10.0);
        cube.push_level(vec![slice("country", "US", 0.0, 10.0)]);
        score_cube(&mut cube, std::f64::consts::E);

        let us = &cube.levels()[1][0];
        assert_eq!(us.deviation, 0.0);
        assert_eq!(us.cost, 0.0);
    }

    #[test]
    fn test_score_cube_regularizer_discounts_tiny_baselines() {
        // Same absolute deviation, but the near-zero-baseline slice scores lower
        let mut cube = Cube::new(1000.0, 1000.0);
        cube.push_level(vec![
            slice("country", "US", 500.0, 520.0),
            slice("country", "XX", 0.5, 20.5),
        ]);
        score_cube(&mut cube, std::f64::consts::E);

        let level1 = &cube.levels()[1];
        assert_eq!(level1[0].deviation, 20.0);
        assert_eq!(level1[1].deviation, 20.0);
        assert!(level1[0].cost > level1[1].cost);
    }

    #[test]
    fn test_score_cube_root_stays_zero() {
        let mut cube = Cube::new(150.0, 190.0);
        score_cube(&mut cube, std::f64::consts::E);
        assert_eq!(cube.root().cost, 0.0);
        assert_eq!(cube.root().deviation, 0.0);
    }

    #[test]
    fn test_compare_slices_prefers_higher_cost_then_lower_level() {
        let mut a = slice("country", "US", 100.0, 150.0);
        a.cost = 10.0;
        let mut b = slice("country", "UK", 100.0, 150.0);
        b.cost = 5.0;
        assert_eq!(compare_slices(&a, &b), Ordering::Less);

        let mut deep = Slice::new(
            SliceKey::root().child("country", "US").child("device", "mobile"),
            100.0,
            150.0,
        );
        deep.cost = 10.0;
        // Equal cost, equal |change|: the shallower slice wins
        assert_eq!(compare_slices(&a, &deep), Ordering::Less);
    }

    #[test]
    fn test_compare_slices_ties_break_on_canonical_key() {
        let mut a = slice("country", "UK", 100.0, 150.0);
        let mut b = slice("country", "US", 100.0, 150.0);
        a.cost = 10.0;
        b.cost = 10.0;
        assert_eq!(compare_slices(&a, &b), Ordering::Less);
    }
}
