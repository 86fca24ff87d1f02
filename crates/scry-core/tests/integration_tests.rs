//! Integration tests for scry-core
//!
//! These tests exercise the full request -> fetch -> cube -> summary
//! workflow against an in-memory source.

use std::sync::Arc;

use scry_core::{
    EngineConfig, Error, MemorySource, SummaryEngine, SummaryRequest, TimeRange,
};

/// Baseline window [0, 100), current window [100, 200)
const BASELINE: TimeRange = TimeRange { start: 0, end: 100 };
const CURRENT: TimeRange = TimeRange {
    start: 100,
    end: 200,
};

/// Scenario A data: US 100 -> 150, UK 50 -> 40
fn scenario_a_source() -> Arc<MemorySource> {
    let mut source = MemorySource::new("pageviews", "views");
    source.add_row(10, 100.0, [("country", "US")]);
    source.add_row(20, 50.0, [("country", "UK")]);
    source.add_row(110, 150.0, [("country", "US")]);
    source.add_row(120, 40.0, [("country", "UK")]);
    Arc::new(source)
}

/// Two-dimensional data with an anomaly concentrated in US mobile traffic
fn two_dimensional_source() -> Arc<MemorySource> {
    let mut source = MemorySource::new("pageviews", "views");
    for (ts, factor) in [(10, 1.0), (110, 1.0)] {
        source.add_row(ts, 40.0 * factor, [("country", "US"), ("device", "desktop")]);
        source.add_row(ts, 50.0 * factor, [("country", "UK"), ("device", "mobile")]);
        source.add_row(ts, 30.0 * factor, [("country", "UK"), ("device", "desktop")]);
    }
    // US mobile jumps from 60 to 180
    source.add_row(10, 60.0, [("country", "US"), ("device", "mobile")]);
    source.add_row(110, 180.0, [("country", "US"), ("device", "mobile")]);
    Arc::new(source)
}

fn request() -> SummaryRequest {
    SummaryRequest::new("pageviews", "views").with_windows(BASELINE, CURRENT)
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[tokio::test]
async fn test_scenario_a_ranked_summary() {
    let engine = SummaryEngine::new(scenario_a_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country"])
                .with_depth(1)
                .with_summary_size(2),
        )
        .await
        .expect("summarize failed");

    assert_eq!(response.global_baseline, 150.0);
    assert_eq!(response.global_current, 190.0);
    assert_eq!(response.entries.len(), 2);

    let first = &response.entries[0];
    assert_eq!(first.dimensions, vec!["country"]);
    assert_eq!(first.values, vec!["US"]);
    assert!(first.current_value > first.baseline_value);

    let second = &response.entries[1];
    assert_eq!(second.values, vec!["UK"]);
    assert!(second.current_value < second.baseline_value);

    assert!(first.cost >= second.cost);
}

#[tokio::test]
async fn test_scenario_b_one_side_error_excludes_opposing_slice() {
    let engine = SummaryEngine::new(scenario_a_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country"])
                .with_depth(1)
                .with_summary_size(2)
                .with_one_side_error(true),
        )
        .await
        .unwrap();

    // Global change is positive; UK moved down and must be excluded
    assert_eq!(response.entries.len(), 1);
    assert_eq!(response.entries[0].values, vec!["US"]);
}

#[tokio::test]
async fn test_scenario_c_invalid_configuration() {
    let engine = SummaryEngine::new(scenario_a_source());

    let err = engine
        .summarize(&request().with_dimensions(["country"]).with_summary_size(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    let err = engine
        .summarize(&request().with_dimensions(["country"]).with_depth(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_scenario_d_zero_baseline_is_not_a_fault() {
    let mut source = MemorySource::new("pageviews", "views");
    // Nothing in the baseline window at all
    source.add_row(110, 10.0, [("country", "US")]);
    let engine = SummaryEngine::new(Arc::new(source));

    let response = engine
        .summarize(&request().with_dimensions(["country"]))
        .await
        .expect("zero baseline must not fault");

    assert_eq!(response.global_baseline, 0.0);
    assert_eq!(response.global_current, 10.0);
    // The fallback makes every deviation zero: nothing to explain
    assert!(response.entries.is_empty());
    assert_eq!(response.explained_fraction, 0.0);
}

#[tokio::test]
async fn test_zero_global_change_yields_empty_summary() {
    let mut source = MemorySource::new("pageviews", "views");
    source.add_row(10, 100.0, [("country", "US")]);
    source.add_row(110, 100.0, [("country", "US")]);
    let engine = SummaryEngine::new(Arc::new(source));

    let response = engine
        .summarize(&request().with_dimensions(["country"]))
        .await
        .unwrap();
    assert!(response.entries.is_empty());
    assert_eq!(response.explained_fraction, 0.0);
}

// =============================================================================
// Property Tests
// =============================================================================

#[tokio::test]
async fn test_depth_bound_holds() {
    let engine = SummaryEngine::new(two_dimensional_source());
    for depth in 1..=3 {
        let response = engine
            .summarize(
                &request()
                    .with_dimensions(["country", "device"])
                    .with_depth(depth)
                    .with_summary_size(10),
            )
            .await
            .unwrap();
        for entry in &response.entries {
            assert!(
                (1..=depth).contains(&entry.dimensions.len()),
                "depth {} produced a {}-dimension entry",
                depth,
                entry.dimensions.len()
            );
        }
    }
}

#[tokio::test]
async fn test_excluded_dimensions_never_appear() {
    let engine = SummaryEngine::new(two_dimensional_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country"])
                .with_excluded(["device"])
                .with_depth(2)
                .with_summary_size(10),
        )
        .await
        .unwrap();

    assert!(!response.entries.is_empty());
    for entry in &response.entries {
        assert!(!entry.dimensions.iter().any(|d| d == "device"));
    }
}

#[tokio::test]
async fn test_direction_consistency_under_one_side_error() {
    let engine = SummaryEngine::new(two_dimensional_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country", "device"])
                .with_depth(2)
                .with_summary_size(10)
                .with_one_side_error(true),
        )
        .await
        .unwrap();

    let global_change = response.global_current - response.global_baseline;
    assert!(global_change > 0.0);
    for entry in &response.entries {
        assert!(
            entry.current_value - entry.baseline_value > 0.0,
            "entry {:?} moved against the global direction",
            entry.values
        );
    }
}

#[tokio::test]
async fn test_non_overlap_invariant() {
    let engine = SummaryEngine::new(two_dimensional_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country", "device"])
                .with_depth(2)
                .with_summary_size(10),
        )
        .await
        .unwrap();

    assert!(response.entries.len() >= 2);
    for (i, a) in response.entries.iter().enumerate() {
        for b in response.entries.iter().skip(i + 1) {
            let a_pairs: Vec<(&str, &str)> = a
                .dimensions
                .iter()
                .zip(&a.values)
                .map(|(d, v)| (d.as_str(), v.as_str()))
                .collect();
            let b_pairs: Vec<(&str, &str)> = b
                .dimensions
                .iter()
                .zip(&b.values)
                .map(|(d, v)| (d.as_str(), v.as_str()))
                .collect();
            let (small, large) = if a_pairs.len() <= b_pairs.len() {
                (&a_pairs, &b_pairs)
            } else {
                (&b_pairs, &a_pairs)
            };
            assert!(
                !small.iter().all(|p| large.contains(p)),
                "entries {:?} and {:?} overlap",
                a.values,
                b.values
            );
        }
    }
}

#[tokio::test]
async fn test_determinism_byte_identical_responses() {
    let engine = SummaryEngine::new(two_dimensional_source());
    let req = request()
        .with_dimensions(["country", "device"])
        .with_depth(2)
        .with_summary_size(4);

    let first = engine.summarize(&req).await.unwrap();
    let mut serialized = Vec::new();
    for _ in 0..5 {
        let response = engine.summarize(&req).await.unwrap();
        serialized.push(serde_json::to_string(&response).unwrap());
    }
    let reference = serde_json::to_string(&first).unwrap();
    assert!(serialized.iter().all(|s| *s == reference));
}

#[tokio::test]
async fn test_totals_match_level_one_sums() {
    let engine = SummaryEngine::new(scenario_a_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country"])
                .with_depth(1)
                .with_summary_size(10),
        )
        .await
        .unwrap();

    let baseline_sum: f64 = response.entries.iter().map(|e| e.baseline_value).sum();
    let current_sum: f64 = response.entries.iter().map(|e| e.current_value).sum();
    assert!((baseline_sum - response.global_baseline).abs() < 1e-9);
    assert!((current_sum - response.global_current).abs() < 1e-9);
}

// =============================================================================
// Hierarchy and Configuration Tests
// =============================================================================

#[tokio::test]
async fn test_hierarchy_keeps_children_under_parents() {
    let mut source = MemorySource::new("pageviews", "views");
    source.add_row(10, 80.0, [("continent", "NA"), ("country", "US")]);
    source.add_row(10, 20.0, [("continent", "EU"), ("country", "DE")]);
    source.add_row(110, 160.0, [("continent", "NA"), ("country", "US")]);
    source.add_row(110, 20.0, [("continent", "EU"), ("country", "DE")]);
    let engine = SummaryEngine::new(Arc::new(source));

    let response = engine
        .summarize(
            &request()
                .with_dimensions(["continent", "country"])
                .with_hierarchy(["continent", "country"])
                .with_depth(2)
                .with_summary_size(10),
        )
        .await
        .unwrap();

    // country may only appear together with continent
    for entry in &response.entries {
        if entry.dimensions.iter().any(|d| d == "country") {
            assert!(entry.dimensions.iter().any(|d| d == "continent"));
        }
    }
}

#[tokio::test]
async fn test_malformed_hierarchy_rejected_before_fetch() {
    // Identity-mismatched source: any fetch would fail, so an
    // InvalidConfiguration proves validation ran first
    let engine = SummaryEngine::new(Arc::new(MemorySource::new("other", "other")));
    let err = engine
        .summarize(
            &request()
                .with_dimensions(["country", "city"])
                .with_hierarchy(["country", "city"])
                .with_hierarchy(["country"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_overlapping_exclude_and_group_by_rejected() {
    let engine = SummaryEngine::new(scenario_a_source());
    let err = engine
        .summarize(
            &request()
                .with_dimensions(["country"])
                .with_excluded(["country"]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_empty_dimensions_yield_empty_summary() {
    let engine = SummaryEngine::new(scenario_a_source());
    let response = engine.summarize(&request()).await.unwrap();
    assert!(response.entries.is_empty());
    assert_eq!(response.global_baseline, 0.0);
}

#[tokio::test]
async fn test_cube_overflow_reported() {
    let config = EngineConfig {
        max_total_slices: 2,
        ..Default::default()
    };
    let engine = SummaryEngine::with_config(two_dimensional_source(), config);
    let err = engine
        .summarize(
            &request()
                .with_dimensions(["country", "device"])
                .with_depth(2),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CubeOverflow { .. }));
    assert!(err.to_string().contains("reduce depth"));
}

#[tokio::test]
async fn test_filters_restrict_the_analysis() {
    let engine = SummaryEngine::new(two_dimensional_source());
    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country"])
                .with_filter("device", "mobile")
                .with_depth(1)
                .with_summary_size(10),
        )
        .await
        .unwrap();

    // Mobile only: US 60 -> 180, UK 50 -> 50
    assert_eq!(response.global_baseline, 110.0);
    assert_eq!(response.global_current, 230.0);
}

#[tokio::test]
async fn test_deep_request_on_csv_loaded_source() {
    let csv = "timestamp,value,country,device\n\
               10,60,US,mobile\n\
               10,40,US,desktop\n\
               10,50,UK,mobile\n\
               110,180,US,mobile\n\
               110,40,US,desktop\n\
               110,50,UK,mobile\n";
    let source = MemorySource::from_csv(
        csv.as_bytes(),
        "pageviews",
        "views",
        &scry_core::source::CsvSourceOptions::default(),
    )
    .unwrap();
    let engine = SummaryEngine::new(Arc::new(source));

    let response = engine
        .summarize(
            &request()
                .with_dimensions(["country", "device"])
                .with_depth(2)
                .with_summary_size(1),
        )
        .await
        .unwrap();

    // The anomaly is concentrated in US mobile traffic
    assert_eq!(response.entries.len(), 1);
    let top = &response.entries[0];
    assert!(top.values.contains(&"US".to_string()));
    assert!(top.values.contains(&"mobile".to_string()) || top.values == vec!["US"]);
}
