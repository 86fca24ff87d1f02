//! Scry Core Library
//!
//! Shared functionality for the Scry root-cause summarization engine:
//! - Hierarchy-aware cube construction over dimension aggregates
//! - Cost model scoring slices by distinctive contribution to a change
//! - One-side-error direction filtering
//! - Greedy non-overlapping summary selection
//! - Pluggable aggregate sources (in-memory, CSV-backed)

pub mod cube;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod source;

pub use cube::{Cube, Slice, SliceKey};
pub use engine::{EngineConfig, SummaryEngine};
pub use error::{Error, Result};
pub use hierarchy::DimensionHierarchy;
pub use models::{
    DimensionFilter, SummaryEntry, SummaryRequest, SummaryResponse, TimeRange,
};
pub use source::{AggregateSource, CsvSourceOptions, MemorySource, SourceScope};
