//! API handlers
//!
//! Handlers are organized by domain:
//! - `source` - source description and liveness endpoints
//! - `summary` - the cube summarization endpoint

mod source;
mod summary;

pub use source::*;
pub use summary::*;
