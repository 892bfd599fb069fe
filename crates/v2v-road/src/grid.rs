//! Synthetic grid network.
//!
//! Serves two purposes: the OSM loader's fallback when no usable input file
//! exists, and a deterministic fixture for planner and engine tests.

use v2v_core::GeoPoint;

use crate::graph::{RoadClass, RoadGraph};

/// Build a `dim × dim` lattice of residential streets centred on `center`,
/// with nodes `spacing_m` metres apart, and its spatial index.
///
/// Node ids are row-major from the south-west corner: node `(row, col)` is
/// `row * dim + col`, rows increasing northward and columns eastward.  Edge
/// lengths are the haversine distances of the actual endpoints, which stay
/// within a fraction of a percent of `spacing_m` at city scale.
pub fn build_grid(center: GeoPoint, dim: usize, spacing_m: f64) -> RoadGraph {
    assert!(dim >= 2, "grid needs at least 2×2 nodes");

    let mut graph = RoadGraph::with_capacity(dim * dim, 4 * dim * (dim - 1));
    let half_span = spacing_m * (dim as f64 - 1.0) / 2.0;
    let south_west = center
        .destination(half_span, std::f64::consts::PI) // due south
        .destination(half_span, -std::f64::consts::FRAC_PI_2); // due west

    for row in 0..dim {
        let row_anchor = south_west.destination(spacing_m * row as f64, 0.0);
        for col in 0..dim {
            let pos = row_anchor.destination(spacing_m * col as f64, std::f64::consts::FRAC_PI_2);
            graph.add_node(pos.lat, pos.lon);
        }
    }

    let class = RoadClass::Residential;
    let speed = class.default_speed_mps();
    let node = |row: usize, col: usize| v2v_core::NodeId((row * dim + col) as u32);

    for row in 0..dim {
        for col in 0..dim {
            if col + 1 < dim {
                let (a, b) = (node(row, col), node(row, col + 1));
                let len = graph.node_pos(a).distance_m(graph.node_pos(b));
                graph.add_segment(a, b, len, speed, class, "");
            }
            if row + 1 < dim {
                let (a, b) = (node(row, col), node(row + 1, col));
                let len = graph.node_pos(a).distance_m(graph.node_pos(b));
                graph.add_segment(a, b, len, speed, class, "");
            }
        }
    }

    graph.build_spatial_index();
    graph
}
