//! OSM PBF loader — enabled with the `osm` Cargo feature.
//!
//! # What is loaded
//!
//! Only drivable `highway=*` ways are included (see
//! [`RoadClass::from_highway`]); footways, buildings, POIs and relations are
//! ignored.  One-way roads add a single directed edge; two-way roads add
//! both directions.  Speeds come from the class defaults — `maxspeed` tags
//! are not parsed.
//!
//! # Memory note
//!
//! The loader buffers all OSM nodes in a `HashMap<i64, GeoPoint>` for the
//! first pass (ways reference node IDs by OSM integer ID).  The map is freed
//! before edges are added.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{info, warn};
use osmpbf::{Element, ElementReader};

use v2v_core::{GeoPoint, NodeId};

use crate::error::{RoadError, RoadResult};
use crate::graph::{RoadClass, RoadGraph};
use crate::grid::build_grid;

/// Dimensions of the fallback grid synthesized by [`load_or_grid`].
const FALLBACK_GRID_DIM: usize = 10;
const FALLBACK_GRID_SPACING_M: f64 = 500.0;

// ── Public entry points ───────────────────────────────────────────────────────

/// Load a road network from an OSM PBF file into `graph`.
///
/// The graph is cleared first; on success its spatial index is built.
///
/// # Errors
///
/// [`RoadError::Io`] on file errors, [`RoadError::Osm`] on parse errors or
/// when the file contains no drivable ways.
pub fn load_from_pbf(path: &Path, graph: &mut RoadGraph) -> RoadResult<()> {
    graph.clear();

    // ── Phase 1: collect all OSM nodes + road ways in one sequential pass ──
    let reader =
        ElementReader::from_path(path).map_err(|e| RoadError::Osm(e.to_string()))?;

    let mut all_nodes: HashMap<i64, GeoPoint> = HashMap::new();
    let mut road_ways: Vec<OsmWay> = Vec::new();

    reader
        .for_each(|elem| match elem {
            Element::Node(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::DenseNode(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::Way(w) => {
                // Collect tags eagerly so &str lifetimes don't escape the closure.
                let tags: Vec<(&str, &str)> = w.tags().collect();
                let highway = tags
                    .iter()
                    .find(|(k, _)| *k == "highway")
                    .map(|(_, v)| *v)
                    .unwrap_or("");

                if let Some(class) = RoadClass::from_highway(highway) {
                    let name = tags
                        .iter()
                        .find(|(k, _)| *k == "name")
                        .map(|(_, v)| (*v).to_owned())
                        .unwrap_or_default();
                    let refs: Vec<i64> = w.refs().collect();
                    road_ways.push(OsmWay {
                        refs,
                        class,
                        name,
                        oneway: is_oneway(highway, &tags),
                    });
                }
            }
            _ => {}
        })
        .map_err(|e| RoadError::Osm(e.to_string()))?;

    if road_ways.is_empty() {
        return Err(RoadError::Osm("no drivable ways in input".into()));
    }

    // ── Phase 2: identify road-referenced node IDs ────────────────────────
    let road_node_ids: HashSet<i64> = road_ways
        .iter()
        .flat_map(|w| w.refs.iter().copied())
        .collect();

    // ── Phase 3: build the graph ──────────────────────────────────────────
    let mut osm_to_graph: HashMap<i64, NodeId> = HashMap::with_capacity(road_node_ids.len());
    for osm_id in &road_node_ids {
        if let Some(pos) = all_nodes.get(osm_id) {
            let id = graph.add_node(pos.lat, pos.lon);
            osm_to_graph.insert(*osm_id, id);
        }
    }

    // Free the full node map — no longer needed.
    drop(all_nodes);
    drop(road_node_ids);

    for way in &road_ways {
        let speed = way.class.default_speed_mps();
        for window in way.refs.windows(2) {
            let (osm_a, osm_b) = (window[0], window[1]);
            if let (Some(&from), Some(&to)) =
                (osm_to_graph.get(&osm_a), osm_to_graph.get(&osm_b))
            {
                let len_m = graph.node_pos(from).distance_m(graph.node_pos(to));
                if len_m <= 0.0 {
                    continue; // duplicate node in way
                }
                graph.add_edge(from, to, len_m, speed, way.class, &way.name);
                if !way.oneway {
                    graph.add_edge(to, from, len_m, speed, way.class, &way.name);
                }
            }
        }
    }

    graph.build_spatial_index();
    info!(
        "OSM load complete: {} nodes, {} edges from {}",
        graph.node_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(())
}

/// Load from `path` when given and readable; otherwise synthesize the 10×10
/// test grid centred on `anchor`.
pub fn load_or_grid(path: Option<&Path>, anchor: GeoPoint, graph: &mut RoadGraph) {
    if let Some(p) = path {
        match load_from_pbf(p, graph) {
            Ok(()) => return,
            Err(e) => warn!("OSM load of {} failed ({e}); using synthetic grid", p.display()),
        }
    }
    *graph = build_grid(anchor, FALLBACK_GRID_DIM, FALLBACK_GRID_SPACING_M);
    info!(
        "synthetic grid ready: {} nodes around {anchor}",
        graph.node_count()
    );
}

// ── Internal types ────────────────────────────────────────────────────────────

struct OsmWay {
    refs: Vec<i64>,
    class: RoadClass,
    name: String,
    oneway: bool,
}

/// Determine whether a way should be treated as one-way for car traffic.
///
/// Motorways and motorway links are implicitly one-way in OSM convention.
fn is_oneway(highway: &str, tags: &[(&str, &str)]) -> bool {
    let explicit = tags
        .iter()
        .any(|(k, v)| *k == "oneway" && matches!(*v, "yes" | "1" | "true"));
    let implicit = matches!(highway, "motorway" | "motorway_link");
    explicit || implicit
}
