//! `v2v-net` — the dynamic proximity graph of the simulator.
//!
//! A link `(i, j)` exists iff the haversine distance between the two
//! vehicles is within **both** transmission radii — asymmetric ranges never
//! form a link, so the graph is undirected by construction.  The graph is
//! rebuilt from a position snapshot (typically every few ticks); queries
//! between rebuilds see a consistent adjacency because the whole map is
//! swapped at once.

pub mod interference;


pub use interference::{InterferenceGraph, VehiclePoint};
