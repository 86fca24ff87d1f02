//! Dimension hierarchy resolution
//!
//! A hierarchy is declared as ordered paths of dimension names, outer to
//! inner. An edge parent -> child means the child may only be fixed in a
//! slice whose key already fixes the parent. Dimensions absent from every
//! path are independent and combine freely, subject to depth and exclusions.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Error, Result};

/// Resolved hierarchy forest: per-dimension parent plus a canonical
/// expansion order (path dimensions outer-to-inner, then independent
/// dimensions in request order).
#[derive(Debug, Clone, Default)]
pub struct DimensionHierarchy {
    order: Vec<String>,
    parents: HashMap<String, String>,
    order_index: HashMap<String, usize>,
}

impl DimensionHierarchy {
    /// Resolve hierarchy paths against the analyzed and excluded dimensions
    ///
    /// - A dimension appearing in more than one path position is a malformed
    ///   hierarchy and fails with `InvalidConfiguration`.
    /// - Path entries naming excluded dimensions are dropped (exclusion wins,
    ///   not an error); the chain is spliced around the removed node.
    /// - Path entries naming dimensions that are not analyzed are dropped the
    ///   same way.
    /// - Analyzed dimensions not mentioned by any path become independent
    ///   single-node trees, appended in request order.
    pub fn resolve(
        hierarchies: &[Vec<String>],
        dimensions: &[String],
        excluded: &HashSet<String>,
    ) -> Result<Self> {
        let mut seen_in_paths = HashSet::new();
        for path in hierarchies {
            for dimension in path {
                if !seen_in_paths.insert(dimension.as_str()) {
                    return Err(Error::InvalidConfiguration(format!(
                        "malformed hierarchy: dimension '{}' appears more than once",
                        dimension
                    )));
                }
            }
        }

        let analyzed: HashSet<&str> = dimensions.iter().map(String::as_str).collect();

        let mut order = Vec::new();
        let mut parents = HashMap::new();
        let mut in_order = HashSet::new();

        for path in hierarchies {
            let mut previous: Option<&str> = None;
            for dimension in path {
                if excluded.contains(dimension.as_str()) {
                    debug!(dimension, "Dropping excluded dimension from hierarchy");
                    continue;
                }
                if !analyzed.contains(dimension.as_str()) {
                    debug!(dimension, "Dropping unanalyzed dimension from hierarchy");
                    continue;
                }
                if let Some(parent) = previous {
                    parents.insert(dimension.clone(), parent.to_string());
                }
                order.push(dimension.clone());
                in_order.insert(dimension.as_str());
                previous = Some(dimension.as_str());
            }
        }

        for dimension in dimensions {
            if !in_order.contains(dimension.as_str()) {
                order.push(dimension.clone());
            }
        }

        let order_index = order
            .iter()
            .enumerate()
            .map(|(i, d)| (d.clone(), i))
            .collect();

        Ok(Self {
            order,
            parents,
            order_index,
        })
    }

    /// All analyzed dimensions in expansion order (parents before children)
    pub fn expansion_order(&self) -> &[String] {
        &self.order
    }

    /// The hierarchy parent of a dimension, if it has one
    pub fn parent_of(&self, dimension: &str) -> Option<&str> {
        self.parents.get(dimension).map(String::as_str)
    }

    /// Position of a dimension in the expansion order
    pub fn order_index(&self, dimension: &str) -> Option<usize> {
        self.order_index.get(dimension).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
