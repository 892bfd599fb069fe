//! Pre-planned path pool with binary persistence.
//!
//! Planning thousands of paths dominates population-creation time, so the
//! pool can be generated once and reloaded across runs.  Paths are handed
//! out round-robin by [`PathCache::next_path`].
//!
//! # File format
//!
//! Big-endian throughout:
//!
//! ```text
//! u32  magic    0xCAFEBABE
//! u32  version  1
//! u32  path count
//! per path:
//!   u32  point count
//!   point count × (f64 x = lon, f64 y = lat)
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{info, warn};

use v2v_core::{GeoPoint, SimRng};

use crate::error::{RoadError, RoadResult};
use crate::graph::RoadGraph;
use crate::planner::AStarPlanner;

pub const CACHE_MAGIC: u32 = 0xCAFE_BABE;
pub const CACHE_VERSION: u32 = 1;

/// Paths shorter than this many points are discarded by `generate` — they
/// correspond to trips of a block or less.
const MIN_CACHED_POINTS: usize = 5;

/// A circular pool of pre-planned paths.
#[derive(Default)]
pub struct PathCache {
    paths: Vec<Vec<GeoPoint>>,
    cursor: usize,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.cursor = 0;
    }

    /// All cached paths in generation order.
    pub fn paths(&self) -> &[Vec<GeoPoint>] {
        &self.paths
    }

    /// Plan `count` paths between random vertex pairs.
    ///
    /// Retries up to `3 × count` attempts; trivial and failed plans are
    /// skipped.  Randomness comes from the caller's stream so generation is
    /// reproducible.
    pub fn generate(
        &mut self,
        graph: &RoadGraph,
        planner: &AStarPlanner,
        rng: &mut SimRng,
        count: usize,
    ) {
        self.clear();

        let n = graph.node_count();
        if n < 2 {
            warn!("cannot generate paths: graph has {n} nodes");
            return;
        }

        let max_attempts = count * 3;
        let mut attempts = 0;
        while self.paths.len() < count && attempts < max_attempts {
            attempts += 1;

            let a = rng.gen_range(0..n as u32);
            let b = rng.gen_range(0..n as u32);
            if a == b {
                continue;
            }

            let start = graph.node_pos(v2v_core::NodeId(a));
            let end = graph.node_pos(v2v_core::NodeId(b));
            match planner.find_path(graph, start, end) {
                Ok(path) if path.len() >= MIN_CACHED_POINTS => self.paths.push(path),
                Ok(_) | Err(_) => {}
            }
        }

        info!(
            "path cache ready: {} paths from {} attempts",
            self.paths.len(),
            attempts
        );
    }

    /// Next path in circular order, or `None` when the pool is empty.
    pub fn next_path(&mut self) -> Option<Vec<GeoPoint>> {
        if self.paths.is_empty() {
            return None;
        }
        let path = self.paths[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.paths.len();
        Some(path)
    }

    // ── Persistence ───────────────────────────────────────────────────────

    pub fn save(&self, path: &Path) -> RoadResult<()> {
        let mut out = BufWriter::new(File::create(path)?);

        out.write_all(&CACHE_MAGIC.to_be_bytes())?;
        out.write_all(&CACHE_VERSION.to_be_bytes())?;
        out.write_all(&(self.paths.len() as u32).to_be_bytes())?;

        for p in &self.paths {
            out.write_all(&(p.len() as u32).to_be_bytes())?;
            for point in p {
                out.write_all(&point.lon.to_be_bytes())?; // x
                out.write_all(&point.lat.to_be_bytes())?; // y
            }
        }

        out.flush()?;
        info!("saved {} paths to {}", self.paths.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> RoadResult<PathCache> {
        let mut input = BufReader::new(File::open(path)?);

        let magic = read_u32(&mut input)?;
        let version = read_u32(&mut input)?;
        if magic != CACHE_MAGIC {
            return Err(RoadError::Cache(format!("bad magic 0x{magic:08X}")));
        }
        if version != CACHE_VERSION {
            return Err(RoadError::Cache(format!("unsupported version {version}")));
        }

        let path_count = read_u32(&mut input)? as usize;
        let mut paths = Vec::with_capacity(path_count);
        for _ in 0..path_count {
            let point_count = read_u32(&mut input)? as usize;
            let mut points = Vec::with_capacity(point_count);
            for _ in 0..point_count {
                let lon = read_f64(&mut input)?;
                let lat = read_f64(&mut input)?;
                points.push(GeoPoint::new(lat, lon));
            }
            paths.push(points);
        }

        info!("loaded {} paths from {}", paths.len(), path.display());
        Ok(PathCache { paths, cursor: 0 })
    }
}

fn read_u32(r: &mut impl Read) -> RoadResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> RoadResult<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}
