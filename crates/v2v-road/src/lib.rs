//! `v2v-road` — the static road side of the simulator.
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | [`graph`]   | `RoadGraph`: directed weighted graph + nearest-node index |
//! | [`planner`] | `AStarPlanner`: A* with haversine heuristic, random paths |
//! | [`grid`]    | Synthetic test grid (OSM fallback, planner fixtures)    |
//! | [`cache`]   | `PathCache`: pre-planned path pool with binary save/load |
//! | [`osm`]     | OSM PBF loader (cargo feature `osm`)                    |
//!
//! The graph's nearest-node index is a flat vector scanned with an early
//! exit; the R-tree spatial index of the simulator lives in `v2v-net`, over
//! vehicle positions, not road nodes.

pub mod cache;
pub mod error;
pub mod graph;
pub mod grid;
pub mod planner;

#[cfg(feature = "osm")]
pub mod osm;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cache::PathCache;
pub use error::{RoadError, RoadResult};
pub use graph::{RoadClass, RoadGraph};
pub use grid::build_grid;
pub use planner::{AStarPlanner, PlanError};
