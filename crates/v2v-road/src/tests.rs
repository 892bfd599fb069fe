//! Unit tests for v2v-road.
//!
//! All tests use hand-crafted networks or the synthetic grid, so they run
//! without any OSM file.

#[cfg(test)]
mod helpers {
    use v2v_core::GeoPoint;

    use crate::grid::build_grid;
    use crate::graph::RoadGraph;

    pub const CENTER: GeoPoint = GeoPoint { lat: 47.7508, lon: 7.3359 };

    /// The standard 10×10, 500 m synthetic grid.
    pub fn grid10() -> RoadGraph {
        build_grid(CENTER, 10, 500.0)
    }
}

// ── Graph structure ───────────────────────────────────────────────────────────

#[cfg(test)]
mod graph {
    use v2v_core::NodeId;

    use crate::graph::{RoadClass, RoadGraph};

    #[test]
    fn empty_graph() {
        let g = RoadGraph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_empty());
    }

    #[test]
    fn segment_is_bidirectional() {
        let mut g = RoadGraph::new();
        let a = g.add_node(47.75, 7.33);
        let b = g.add_node(47.76, 7.33);
        let len = g.node_pos(a).distance_m(g.node_pos(b));
        g.add_segment(a, b, len, 13.9, RoadClass::Residential, "Rue du Test");
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.out_degree(a), 1);
        assert_eq!(g.out_degree(b), 1);
        let e = g.out_edges(a)[0];
        assert_eq!(g.edge_to(e), b);
        assert_eq!(g.edge_name(e), "Rue du Test");
        assert_eq!(g.edge_class(e), RoadClass::Residential);
    }

    #[test]
    fn directed_edge_has_no_return() {
        let mut g = RoadGraph::new();
        let a = g.add_node(47.75, 7.33);
        let b = g.add_node(47.76, 7.33);
        let len = g.node_pos(a).distance_m(g.node_pos(b));
        g.add_edge(a, b, len, 36.1, RoadClass::Motorway, "");
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.out_degree(a), 1);
        assert_eq!(g.out_degree(b), 0);
    }

    #[test]
    fn node_ids_are_contiguous() {
        let mut g = RoadGraph::new();
        for i in 0..5 {
            let id = g.add_node(47.75 + i as f64 * 0.001, 7.33);
            assert_eq!(id, NodeId(i));
        }
    }

    #[test]
    fn clear_empties_everything() {
        let mut g = super::helpers::grid10();
        assert!(!g.is_empty());
        g.clear();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.spatial_index_len(), 0);
    }

    #[test]
    fn spatial_index_covers_all_nodes() {
        let g = super::helpers::grid10();
        assert_eq!(g.spatial_index_len(), g.node_count());
    }

    #[test]
    fn road_class_speeds() {
        assert_eq!(RoadClass::Motorway.default_speed_mps(), 36.1);
        assert_eq!(RoadClass::Trunk.default_speed_mps(), 30.5);
        assert_eq!(RoadClass::Primary.default_speed_mps(), 25.0);
        assert_eq!(RoadClass::Secondary.default_speed_mps(), 22.2);
        assert_eq!(RoadClass::Tertiary.default_speed_mps(), 13.9);
        assert_eq!(RoadClass::Service.default_speed_mps(), 13.9);
    }

    #[test]
    fn highway_tag_mapping() {
        assert_eq!(RoadClass::from_highway("motorway"), Some(RoadClass::Motorway));
        assert_eq!(RoadClass::from_highway("motorway_link"), Some(RoadClass::Motorway));
        assert_eq!(RoadClass::from_highway("residential"), Some(RoadClass::Residential));
        assert_eq!(RoadClass::from_highway("footway"), None);
        assert_eq!(RoadClass::from_highway("cycleway"), None);
    }
}

// ── Nearest-node queries ──────────────────────────────────────────────────────

#[cfg(test)]
mod nearest {
    use v2v_core::NodeId;

    use crate::graph::RoadGraph;

    #[test]
    fn exact_position() {
        let g = super::helpers::grid10();
        let pos = g.node_pos(NodeId(0));
        assert_eq!(g.nearest_node(pos.lat, pos.lon), Some(NodeId(0)));
    }

    #[test]
    fn snaps_to_closest_of_two() {
        let mut g = RoadGraph::new();
        let a = g.add_node(47.750, 7.33);
        let b = g.add_node(47.760, 7.33);
        g.build_spatial_index();
        assert_eq!(g.nearest_node(47.752, 7.33), Some(a));
        assert_eq!(g.nearest_node(47.758, 7.33), Some(b));
    }

    #[test]
    fn empty_index_returns_none() {
        let g = RoadGraph::new();
        assert_eq!(g.nearest_node(47.75, 7.33), None);
    }

    #[test]
    fn unbuilt_index_returns_none() {
        let mut g = RoadGraph::new();
        g.add_node(47.75, 7.33);
        // build_spatial_index never called
        assert_eq!(g.nearest_node(47.75, 7.33), None);
    }

    #[test]
    fn prefilter_rejects_distant_queries() {
        let mut g = RoadGraph::new();
        g.add_node(47.75, 7.33);
        g.build_spatial_index();
        // More than a degree away on both axes: every candidate is skipped.
        assert_eq!(g.nearest_node(50.0, 10.0), None);
    }
}

// ── A* planning ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod planner {
    use v2v_core::{GeoPoint, NodeId};

    use crate::graph::RoadGraph;
    use crate::planner::{AStarPlanner, PlanError};

    #[test]
    fn same_endpoint_is_trivial() {
        let g = super::helpers::grid10();
        let p = g.node_pos(NodeId(0));
        let path = AStarPlanner::new().find_path(&g, p, p).unwrap();
        assert_eq!(path, vec![p, p]);
    }

    #[test]
    fn empty_graph_errors() {
        let g = RoadGraph::new();
        let p = GeoPoint::new(47.75, 7.33);
        let result = AStarPlanner::new().find_path(&g, p, p);
        assert!(matches!(result, Err(PlanError::GraphEmpty)));
    }

    #[test]
    fn grid_diagonal_is_manhattan() {
        // 10×10 grid with uniform 500 m edges, corner to corner: the shortest
        // path is any monotone staircase of 18 edges = 9 000 m over 19 nodes,
        // never the 9 000·√2 straight line.
        let g = super::helpers::grid10();
        let start = g.node_pos(NodeId(0)); // south-west corner
        let end = g.node_pos(NodeId(99)); // north-east corner

        let path = AStarPlanner::new().find_path(&g, start, end).unwrap();

        // Padded endpoints duplicate the corner nodes.
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&end));
        let node_count = path.len() - 2;
        assert!((19..=21).contains(&node_count), "got {node_count} nodes");

        let total: f64 = path.windows(2).map(|w| w[0].distance_m(w[1])).sum();
        assert!((total - 9_000.0).abs() < 45.0, "got {total} m");
    }

    #[test]
    fn disconnected_graph_has_no_route() {
        let mut g = RoadGraph::new();
        g.add_node(47.75, 7.33);
        g.add_node(47.76, 7.34);
        g.build_spatial_index();
        let result = AStarPlanner::new().find_path(
            &g,
            GeoPoint::new(47.75, 7.33),
            GeoPoint::new(47.76, 7.34),
        );
        assert!(matches!(result, Err(PlanError::NoRoute)));
    }

    #[test]
    fn iteration_cap_abandons_search() {
        let g = super::helpers::grid10();
        let planner = AStarPlanner { iteration_cap: Some(1) };
        let result = planner.find_path(&g, g.node_pos(NodeId(0)), g.node_pos(NodeId(99)));
        assert!(matches!(result, Err(PlanError::Timeout(_))));
    }

    #[test]
    fn path_is_edge_connected() {
        // Every consecutive pair of interior points must be joined by an edge.
        let g = super::helpers::grid10();
        let path = AStarPlanner::new()
            .find_path(&g, g.node_pos(NodeId(0)), g.node_pos(NodeId(99)))
            .unwrap();
        for w in path[1..path.len() - 1].windows(2) {
            let a = g.nearest_node(w[0].lat, w[0].lon).unwrap();
            let b = g.nearest_node(w[1].lat, w[1].lon).unwrap();
            assert!(
                g.out_edges(a).iter().any(|&e| g.edge_to(e) == b),
                "no edge {a} → {b}"
            );
        }
    }
}

// ── Random destinations ───────────────────────────────────────────────────────

#[cfg(test)]
mod random_path {
    use v2v_core::{NodeId, SimRng};

    use crate::graph::RoadGraph;
    use crate::planner::{AStarPlanner, PlanError};

    #[test]
    fn reaches_minimum_length() {
        let g = super::helpers::grid10();
        let mut rng = SimRng::new(42);
        let start = g.node_pos(NodeId(0));
        let path = AStarPlanner::new()
            .random_path(&g, &mut rng, start, 500.0)
            .unwrap();
        assert_eq!(path.first(), Some(&start));
        assert!(start.distance_m(*path.last().unwrap()) >= 499.0);
    }

    #[test]
    fn empty_graph_errors() {
        let g = RoadGraph::new();
        let mut rng = SimRng::new(42);
        let result = AStarPlanner::new().random_path(
            &g,
            &mut rng,
            v2v_core::GeoPoint::new(47.75, 7.33),
            500.0,
        );
        assert!(matches!(result, Err(PlanError::GraphEmpty)));
    }

    #[test]
    fn deterministic_given_seed() {
        let g = super::helpers::grid10();
        let start = g.node_pos(NodeId(0));
        let planner = AStarPlanner::new();
        let a = planner.random_path(&g, &mut SimRng::new(7), start, 500.0).unwrap();
        let b = planner.random_path(&g, &mut SimRng::new(7), start, 500.0).unwrap();
        assert_eq!(a, b);
    }
}

// ── Path cache ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod cache {
    use v2v_core::SimRng;

    use crate::cache::PathCache;
    use crate::error::RoadError;
    use crate::planner::AStarPlanner;

    #[test]
    fn generate_fills_pool() {
        let g = super::helpers::grid10();
        let mut cache = PathCache::new();
        cache.generate(&g, &AStarPlanner::new(), &mut SimRng::new(42), 10);
        assert!(!cache.is_empty());
        assert!(cache.paths().iter().all(|p| p.len() >= 5));
    }

    #[test]
    fn next_path_rotates() {
        let g = super::helpers::grid10();
        let mut cache = PathCache::new();
        cache.generate(&g, &AStarPlanner::new(), &mut SimRng::new(42), 5);
        let n = cache.len();
        assert!(n > 0);

        let first = cache.next_path().unwrap();
        for _ in 1..n {
            cache.next_path().unwrap();
        }
        // Full rotation wraps back to the first path.
        assert_eq!(cache.next_path().unwrap(), first);
    }

    #[test]
    fn next_path_on_empty_pool() {
        assert_eq!(PathCache::new().next_path(), None);
    }

    #[test]
    fn save_load_roundtrip_is_bitwise() {
        let g = super::helpers::grid10();
        let mut cache = PathCache::new();
        cache.generate(&g, &AStarPlanner::new(), &mut SimRng::new(42), 8);

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths.bin");
        cache.save(&file).unwrap();

        let loaded = PathCache::load(&file).unwrap();
        assert_eq!(loaded.len(), cache.len());
        for (a, b) in loaded.paths().iter().zip(cache.paths()) {
            assert_eq!(a.len(), b.len());
            for (p, q) in a.iter().zip(b) {
                assert_eq!(p.lat.to_bits(), q.lat.to_bits());
                assert_eq!(p.lon.to_bits(), q.lon.to_bits());
            }
        }
    }

    #[test]
    fn load_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("junk.bin");
        std::fs::write(&file, [0u8; 16]).unwrap();
        assert!(matches!(PathCache::load(&file), Err(RoadError::Cache(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = PathCache::load(std::path::Path::new("/nonexistent/paths.bin"));
        assert!(matches!(result, Err(RoadError::Io(_))));
    }
}

// ── Synthetic grid ────────────────────────────────────────────────────────────

#[cfg(test)]
mod grid {
    use v2v_core::NodeId;

    #[test]
    fn dimensions() {
        let g = super::helpers::grid10();
        assert_eq!(g.node_count(), 100);
        // 2 directions × 2 axes × 10 rows × 9 segments
        assert_eq!(g.edge_count(), 360);
    }

    #[test]
    fn uniform_edge_lengths() {
        let g = super::helpers::grid10();
        for i in 0..g.edge_count() {
            let len = g.edge_length_m(v2v_core::EdgeId(i as u32));
            assert!((len - 500.0).abs() < 2.0, "edge {i} is {len} m");
        }
    }

    #[test]
    fn centred_on_anchor() {
        let g = super::helpers::grid10();
        // The grid midpoint (average of opposite corners) is the anchor.
        let sw = g.node_pos(NodeId(0));
        let ne = g.node_pos(NodeId(99));
        let mid = sw.lerp(ne, 0.5);
        assert!(mid.distance_m(super::helpers::CENTER) < 10.0);
    }
}
