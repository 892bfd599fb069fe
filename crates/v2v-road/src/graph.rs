//! Road graph representation and nearest-node index.
//!
//! # Data layout
//!
//! Nodes are dense: `NodeId(n)` indexes directly into `node_pos`.  Edge
//! attributes live in parallel SoA arrays indexed by `EdgeId`, and each node
//! keeps the list of its outgoing `EdgeId`s.  Per-node adjacency vectors
//! (rather than a CSR row pointer) let the loader interleave `add_node` and
//! `add_edge` freely.
//!
//! # Nearest-node index
//!
//! `build_spatial_index` snapshots every node into a flat
//! `(NodeId, GeoPoint)` vector.  `nearest_node` scans it with a cheap
//! 1-degree delta prefilter and exits early once a candidate within
//! [`NEAREST_EXIT_M`] is found.  For graphs of ≲ 10 k nodes this beats the
//! constant factor of a tree index and needs no rebuild bookkeeping.

use v2v_core::{EdgeId, GeoPoint, NodeId};

/// Early-exit threshold for `nearest_node`, metres.
pub const NEAREST_EXIT_M: f64 = 50.0;

/// Prefilter: candidates more than this many degrees away on either axis are
/// skipped without a haversine evaluation.
const NEAREST_PREFILTER_DEG: f64 = 1.0;

// ── RoadClass ─────────────────────────────────────────────────────────────────

/// OSM highway class, carrying the default speed limit assigned when the
/// source data provides none.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Unclassified,
    Service,
}

impl RoadClass {
    /// Map an OSM `highway` tag value to a drivable class, or `None` for
    /// non-drivable ways.  `*_link` ramps map to their base class.
    pub fn from_highway(tag: &str) -> Option<RoadClass> {
        let base = tag.strip_suffix("_link").unwrap_or(tag);
        match base {
            "motorway" => Some(RoadClass::Motorway),
            "trunk" => Some(RoadClass::Trunk),
            "primary" => Some(RoadClass::Primary),
            "secondary" => Some(RoadClass::Secondary),
            "tertiary" => Some(RoadClass::Tertiary),
            "residential" => Some(RoadClass::Residential),
            "unclassified" => Some(RoadClass::Unclassified),
            "service" => Some(RoadClass::Service),
            _ => None,
        }
    }

    /// Default speed limit in m/s for this class.
    pub fn default_speed_mps(self) -> f64 {
        match self {
            RoadClass::Motorway => 36.1,
            RoadClass::Trunk => 30.5,
            RoadClass::Primary => 25.0,
            RoadClass::Secondary => 22.2,
            _ => 13.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoadClass::Motorway => "motorway",
            RoadClass::Trunk => "trunk",
            RoadClass::Primary => "primary",
            RoadClass::Secondary => "secondary",
            RoadClass::Tertiary => "tertiary",
            RoadClass::Residential => "residential",
            RoadClass::Unclassified => "unclassified",
            RoadClass::Service => "service",
        }
    }
}

impl std::fmt::Display for RoadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Directed weighted road graph with a flat nearest-node index.
///
/// Streets are bidirectional unless the loader marks them one-way: callers
/// use [`add_segment`](Self::add_segment) for the common case and
/// [`add_edge`](Self::add_edge) for explicit one-way edges.
#[derive(Default)]
pub struct RoadGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    node_pos: Vec<GeoPoint>,
    /// Outgoing `EdgeId`s per node.
    out: Vec<Vec<EdgeId>>,

    // ── Edge data (SoA, indexed by EdgeId) ────────────────────────────────
    edge_from: Vec<NodeId>,
    edge_to: Vec<NodeId>,
    edge_length_m: Vec<f64>,
    edge_speed_mps: Vec<f64>,
    edge_class: Vec<RoadClass>,
    edge_name: Vec<String>,

    // ── Nearest-node index ────────────────────────────────────────────────
    /// Flat `(vertex, position)` snapshot built by `build_spatial_index`.
    spatial_index: Vec<(NodeId, GeoPoint)>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for the expected number of nodes and edges to reduce
    /// reallocations when bulk-loading from OSM.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            node_pos: Vec::with_capacity(nodes),
            out: Vec::with_capacity(nodes),
            edge_from: Vec::with_capacity(edges),
            edge_to: Vec::with_capacity(edges),
            edge_length_m: Vec::with_capacity(edges),
            edge_speed_mps: Vec::with_capacity(edges),
            edge_class: Vec::with_capacity(edges),
            edge_name: Vec::with_capacity(edges),
            spatial_index: Vec::new(),
        }
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, lat: f64, lon: f64) -> NodeId {
        let id = NodeId(self.node_pos.len() as u32);
        self.node_pos.push(GeoPoint::new(lat, lon));
        self.out.push(Vec::new());
        id
    }

    /// Add a **directed** edge from `from` to `to`.
    ///
    /// `length_m` must equal the haversine distance between the endpoints
    /// within 1 % (checked in debug builds).
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        length_m: f64,
        speed_limit_mps: f64,
        class: RoadClass,
        name: &str,
    ) -> EdgeId {
        debug_assert!(length_m > 0.0, "edge length must be positive");
        debug_assert!(
            {
                let d = self.node_pos[from.index()].distance_m(self.node_pos[to.index()]);
                (length_m - d).abs() <= d * 0.01 + 0.5
            },
            "edge length disagrees with endpoint haversine distance"
        );

        let id = EdgeId(self.edge_to.len() as u32);
        self.edge_from.push(from);
        self.edge_to.push(to);
        self.edge_length_m.push(length_m);
        self.edge_speed_mps.push(speed_limit_mps);
        self.edge_class.push(class);
        self.edge_name.push(name.to_owned());
        self.out[from.index()].push(id);
        id
    }

    /// Convenience: add edges in **both directions** for an undirected road
    /// segment (the common case).
    pub fn add_segment(
        &mut self,
        a: NodeId,
        b: NodeId,
        length_m: f64,
        speed_limit_mps: f64,
        class: RoadClass,
        name: &str,
    ) {
        self.add_edge(a, b, length_m, speed_limit_mps, class, name);
        self.add_edge(b, a, length_m, speed_limit_mps, class, name);
    }

    /// Remove all nodes, edges and the spatial index.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Snapshot every node into the flat nearest-node index.  Call once
    /// after loading; `nearest_node` sees nothing added afterwards.
    pub fn build_spatial_index(&mut self) {
        self.spatial_index = self
            .node_pos
            .iter()
            .enumerate()
            .map(|(i, &pos)| (NodeId(i as u32), pos))
            .collect();
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// Length of the nearest-node index (equals `node_count` after
    /// `build_spatial_index`).
    pub fn spatial_index_len(&self) -> usize {
        self.spatial_index.len()
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn node_pos(&self, node: NodeId) -> GeoPoint {
        self.node_pos[node.index()]
    }

    /// Outgoing `EdgeId`s of `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.out[node.index()]
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.out[node.index()].len()
    }

    #[inline]
    pub fn edge_from(&self, edge: EdgeId) -> NodeId {
        self.edge_from[edge.index()]
    }

    #[inline]
    pub fn edge_to(&self, edge: EdgeId) -> NodeId {
        self.edge_to[edge.index()]
    }

    #[inline]
    pub fn edge_length_m(&self, edge: EdgeId) -> f64 {
        self.edge_length_m[edge.index()]
    }

    #[inline]
    pub fn edge_speed_mps(&self, edge: EdgeId) -> f64 {
        self.edge_speed_mps[edge.index()]
    }

    #[inline]
    pub fn edge_class(&self, edge: EdgeId) -> RoadClass {
        self.edge_class[edge.index()]
    }

    #[inline]
    pub fn edge_name(&self, edge: EdgeId) -> &str {
        &self.edge_name[edge.index()]
    }

    // ── Nearest-node query ────────────────────────────────────────────────

    /// Vertex nearest to `(lat, lon)` by haversine distance.
    ///
    /// Returns `None` when the index is empty or every candidate fails the
    /// 1-degree prefilter — never a fabricated vertex.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<NodeId> {
        let query = GeoPoint::new(lat, lon);
        let mut best: Option<(NodeId, f64)> = None;

        for &(node, pos) in &self.spatial_index {
            if (pos.lat - lat).abs() > NEAREST_PREFILTER_DEG
                || (pos.lon - lon).abs() > NEAREST_PREFILTER_DEG
            {
                continue;
            }
            let d = query.distance_m(pos);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node, d));
                if d <= NEAREST_EXIT_M {
                    break;
                }
            }
        }

        best.map(|(node, _)| node)
    }
}
