//! Road-subsystem error type.

use thiserror::Error;

/// Errors produced by `v2v-road` IO paths (OSM load, path cache).
///
/// Planner failures have their own [`PlanError`](crate::PlanError) — they are
/// recovered locally by callers rather than propagated.
#[derive(Debug, Error)]
pub enum RoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path cache format error: {0}")]
    Cache(String),

    #[cfg(feature = "osm")]
    #[error("OSM parse error: {0}")]
    Osm(String),
}

pub type RoadResult<T> = Result<T, RoadError>;
