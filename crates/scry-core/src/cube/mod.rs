//! Multi-dimensional change cube
//!
//! A cube holds every slice built for one summarization request, arranged
//! as an arena indexed by level (number of fixed dimensions). Level 0 is the
//! single root slice carrying the global totals; level k slices fix exactly
//! k dimension values.

pub mod builder;
pub mod cost;
pub mod summary;

pub use builder::CubeBuilder;

use std::cmp::Ordering;

use crate::models::DimensionFilter;

/// An ordered assignment of values to a subset of dimensions
///
/// Assignments are stored in expansion order (parents before children); the
/// builder constructs each key set exactly once, so derived equality on the
/// stored order is sound. Canonical (name-sorted) order is used for subset
/// tests and lexicographic comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SliceKey {
    assignments: Vec<DimensionFilter>,
}

impl SliceKey {
    /// The empty key of the level-0 root slice
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of fixed dimensions
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Fixed dimension names in expansion order
    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|a| a.dimension.as_str())
    }

    /// Fixed values in expansion order, parallel to `dimensions`
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|a| a.value.as_str())
    }

    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.dimension == dimension)
            .map(|a| a.value.as_str())
    }

    pub fn contains_dimension(&self, dimension: &str) -> bool {
        self.assignments.iter().any(|a| a.dimension == dimension)
    }

    /// The last fixed dimension in expansion order, if any
    pub fn last_dimension(&self) -> Option<&str> {
        self.assignments.last().map(|a| a.dimension.as_str())
    }

    /// Extend this key by fixing one more dimension
    pub fn child(&self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        let mut assignments = self.assignments.clone();
        assignments.push(DimensionFilter::new(dimension, value));
        Self { assignments }
    }

    /// The assignments as filters, for pushing down to the aggregate source
    pub fn as_filters(&self) -> &[DimensionFilter] {
        &self.assignments
    }

    /// Name-sorted (dimension, value) pairs
    pub fn canonical(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .assignments
            .iter()
            .map(|a| (a.dimension.as_str(), a.value.as_str()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Whether one key is an ancestor or descendant of the other
    ///
    /// True when the smaller key's assignments are a value-consistent subset
    /// of the larger key's.
    pub fn is_related(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .assignments
            .iter()
            .all(|a| large.get(&a.dimension) == Some(a.value.as_str()))
    }

    /// Lexicographic order on the canonical form
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl std::fmt::Display for SliceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            return write!(f, "(all)");
        }
        let parts: Vec<String> = self.assignments.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// One slice of the cube: a key plus its baseline and current sums
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub key: SliceKey,
    pub baseline_value: f64,
    pub current_value: f64,
    /// Portion of the slice's change not explained by uniform growth;
    /// computed by the cost model, 0 until scored
    pub deviation: f64,
    /// Explanatory score; computed by the cost model, 0 until scored
    pub cost: f64,
}

impl Slice {
    pub fn new(key: SliceKey, baseline_value: f64, current_value: f64) -> Self {
        Self {
            key,
            baseline_value,
            current_value,
            deviation: 0.0,
            cost: 0.0,
        }
    }

    /// Number of fixed dimensions
    pub fn level(&self) -> usize {
        self.key.len()
    }

    pub fn change(&self) -> f64 {
        self.current_value - self.baseline_value
    }
}

/// The full slice arena for one request, indexed by level
#[derive(Debug, Clone)]
pub struct Cube {
    levels: Vec<Vec<Slice>>,
    baseline_total: f64,
    current_total: f64,
}

impl Cube {
    /// Create a cube holding only the root slice with the global totals
    pub fn new(baseline_total: f64, current_total: f64) -> Self {
        let root = Slice::new(SliceKey::root(), baseline_total, current_total);
        Self {
            levels: vec![vec![root]],
            baseline_total,
            current_total,
        }
    }

    pub fn baseline_total(&self) -> f64 {
        self.baseline_total
    }

    pub fn current_total(&self) -> f64 {
        self.current_total
    }

    pub fn global_change(&self) -> f64 {
        self.current_total - self.baseline_total
    }

    /// Append the next level's slices
    pub fn push_level(&mut self, slices: Vec<Slice>) {
        self.levels.push(slices);
    }

    pub fn levels(&self) -> &[Vec<Slice>] {
        &self.levels
    }

    /// The level-0 slice
    pub fn root(&self) -> &Slice {
        &self.levels[0][0]
    }

    /// Total number of slices across all levels, root included
    pub fn total_slices(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// All slices at level >= 1
    pub fn explanatory_slices(&self) -> impl Iterator<Item = &Slice> {
        self.levels.iter().skip(1).flatten()
    }

    pub(crate) fn slices_mut(&mut self) -> impl Iterator<Item = &mut Slice> {
        self.levels.iter_mut().flatten()
    }
}
