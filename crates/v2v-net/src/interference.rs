//! Interference graph: who can currently hear whom.
//!
//! # Rebuild cycle
//!
//! 1. Snapshot positions and radii of all active vehicles (the caller passes
//!    [`VehiclePoint`]s; no reference to the vehicle collection is retained).
//! 2. Bulk-load an R-tree over `(x = lon, y = lat)` points.
//! 3. For each vehicle, query a coarse degree envelope (`radius / 111 320`)
//!    and confirm candidates with the exact haversine distance against both
//!    radii.
//! 4. Swap the adjacency map in one assignment so readers see either the
//!    fully previous or the fully new graph.
//!
//! Each unordered pair is examined once (lowest id owns the pair) and both
//! directions are inserted together, which keeps `j ∈ N(i) ⇔ i ∈ N(j)` true
//! by construction rather than by convention.

use std::collections::{HashMap, HashSet};

use rstar::{RTree, RTreeObject, AABB};

use v2v_core::{GeoPoint, VehicleId, METERS_PER_DEGREE};

// ── Snapshot entry ────────────────────────────────────────────────────────────

/// One vehicle's contribution to a rebuild: identity, position and
/// transmission radius in metres.
#[derive(Copy, Clone, Debug)]
pub struct VehiclePoint {
    pub id: VehicleId,
    pub pos: GeoPoint,
    pub tx_radius_m: f64,
}

/// Entry stored in the R-tree: a 2-D `[lon, lat]` point with the vehicle id.
#[derive(Clone)]
struct TreeEntry {
    point: [f64; 2],
    id: VehicleId,
}

impl RTreeObject for TreeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

// ── InterferenceGraph ─────────────────────────────────────────────────────────

/// Bidirectional proximity graph over transmission disks.
#[derive(Default)]
pub struct InterferenceGraph {
    /// Adjacency, replaced wholesale on every rebuild.
    links: HashMap<VehicleId, HashSet<VehicleId>>,
    /// Side table used for exact distance checks between rebuilds.
    stations: HashMap<VehicleId, (GeoPoint, f64)>,
    tree: RTree<TreeEntry>,
}

impl InterferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full rebuild from a position snapshot.
    ///
    /// Incremental update is a future extension; its correctness under the
    /// symmetry invariant requires atomic dual-edge updates.
    pub fn rebuild(&mut self, snapshot: &[VehiclePoint]) {
        self.stations = snapshot
            .iter()
            .map(|v| (v.id, (v.pos, v.tx_radius_m)))
            .collect();

        let entries: Vec<TreeEntry> = snapshot
            .iter()
            .map(|v| TreeEntry { point: [v.pos.lon, v.pos.lat], id: v.id })
            .collect();
        self.tree = RTree::bulk_load(entries);

        let mut next: HashMap<VehicleId, HashSet<VehicleId>> =
            HashMap::with_capacity(snapshot.len());
        for v in snapshot {
            next.entry(v.id).or_default();
        }

        for v in snapshot {
            let half_deg = v.tx_radius_m / METERS_PER_DEGREE;
            let envelope = AABB::from_corners(
                [v.pos.lon - half_deg, v.pos.lat - half_deg],
                [v.pos.lon + half_deg, v.pos.lat + half_deg],
            );

            for entry in self.tree.locate_in_envelope(&envelope) {
                // The lowest id of a pair owns it; one pass inserts both ends.
                if entry.id <= v.id {
                    continue;
                }
                let &(other_pos, other_radius) = match self.stations.get(&entry.id) {
                    Some(s) => s,
                    None => continue,
                };
                let d = v.pos.distance_m(other_pos);
                if d <= v.tx_radius_m && d <= other_radius {
                    next.entry(v.id).or_default().insert(entry.id);
                    next.entry(entry.id).or_default().insert(v.id);
                }
            }
        }

        self.links = next;
    }

    /// Drop every link and station (engine reset).
    pub fn clear(&mut self) {
        self.links.clear();
        self.stations.clear();
        self.tree = RTree::new();
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// The current neighbor set of `vehicle`, as an owned copy for iteration
    /// safety, sorted by id.  The fixed order keeps loss-trial RNG draws
    /// aligned with targets across replays.  Unknown vehicles have no
    /// neighbors.
    pub fn neighbors(&self, vehicle: VehicleId) -> Vec<VehicleId> {
        let mut out: Vec<VehicleId> = self
            .links
            .get(&vehicle)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// `true` if a bidirectional link currently exists between `a` and `b`.
    pub fn linked(&self, a: VehicleId, b: VehicleId) -> bool {
        self.links.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Every undirected link exactly once, as `(low, high)` id pairs.
    pub fn all_links(&self) -> Vec<(VehicleId, VehicleId)> {
        let mut out = Vec::with_capacity(self.link_count());
        for (&id, neighbors) in &self.links {
            for &other in neighbors {
                if id < other {
                    out.push((id, other));
                }
            }
        }
        out
    }

    /// Current position and radius of `vehicle` as of the last rebuild.
    pub fn station(&self, vehicle: VehicleId) -> Option<(GeoPoint, f64)> {
        self.stations.get(&vehicle).copied()
    }

    // ── Statistics ────────────────────────────────────────────────────────

    /// Number of vehicles in the last snapshot.
    pub fn vehicle_count(&self) -> usize {
        self.stations.len()
    }

    /// Number of undirected links.
    pub fn link_count(&self) -> usize {
        self.links.values().map(HashSet::len).sum::<usize>() / 2
    }

    /// Mean neighbor count over all snapshotted vehicles.
    pub fn average_degree(&self) -> f64 {
        if self.links.is_empty() {
            return 0.0;
        }
        let total: usize = self.links.values().map(HashSet::len).sum();
        total as f64 / self.links.len() as f64
    }
}
