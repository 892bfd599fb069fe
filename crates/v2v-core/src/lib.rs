//! `v2v-core` — foundational types for the `rust_v2v` simulator.
//!
//! This crate is a dependency of every other `v2v-*` crate.  It intentionally
//! has no `v2v-*` dependencies and minimal external ones (only `rand`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module   | Contents                                                  |
//! |----------|-----------------------------------------------------------|
//! | [`ids`]  | `VehicleId`, `NodeId`, `EdgeId`, `MessageId`              |
//! | [`geo`]  | `GeoPoint`, haversine / bearing, Mercator and tile math   |
//! | [`time`] | `Tick`, `SimClock`                                        |
//! | [`rng`]  | `SimRng` — the one seedable generator of the simulation   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public value types.  |

pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use geo::{GeoPoint, EARTH_RADIUS_M, METERS_PER_DEGREE};
pub use ids::{EdgeId, MessageId, NodeId, VehicleId};
pub use rng::SimRng;
pub use time::{SimClock, Tick};
