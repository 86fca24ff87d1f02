//! Error types for Scry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Cube overflow: {slices} slices exceeds limit of {limit} (reduce depth or dimensions)")]
    CubeOverflow { slices: usize, limit: usize },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
