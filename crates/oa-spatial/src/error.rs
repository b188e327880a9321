//! Spatial-subsystem error type.
//!
//! Unreachable destinations and exhausted iteration budgets are *not* errors;
//! they surface as tagged [`PathResult`](crate::PathResult)s.  Only rows that
//! cannot be parsed and sources that cannot deliver any data end up here.

use thiserror::Error;

use oa_core::CoreError;

/// Errors produced by `oa-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("malformed road segment {name:?}: {reason}")]
    MalformedSegment { name: String, reason: String },

    #[error("segment source {source_name} failed: {reason}")]
    SourceFailed { source_name: String, reason: String },

    #[error("no road segment data available: {0}")]
    DataUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "osm")]
    #[error("OSM parse error: {0}")]
    Osm(String),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
