//! Vehicle state and per-tick kinematics.
//!
//! # Movement model
//!
//! Path following steers towards `path[path_cursor]` using an
//! equirectangular approximation: 1 degree ≈ 111 320 m on both axes.  Paths
//! are short relative to Earth's curvature, so the ≤ 1 % error at
//! mid-latitudes stays below the resolution of the communication model.
//! Headings are `atan2(Δlat, Δlon)` — radians from east, counter-clockwise.
//!
//! A vehicle within 1.5 travel-steps of its target snaps onto it and takes
//! the next point; at the end of the path it idles (speed 0) until re-pathed.
//! Without a path the vehicle integrates free-flight along its heading.

use v2v_core::{GeoPoint, VehicleId, METERS_PER_DEGREE};

/// Transmission radius bounds, metres.
pub const TX_RADIUS_MIN_M: f64 = 100.0;
pub const TX_RADIUS_MAX_M: f64 = 500.0;

/// Snap distance as a multiple of one tick's travel step.
const SNAP_FACTOR: f64 = 1.5;

/// A single simulated vehicle.
///
/// Created by the engine at population-set time; mutated only by its own
/// [`advance`](Self::advance) and by the interference subsystem writing
/// `neighbors`; destroyed on reset.
pub struct Vehicle {
    pub id: VehicleId,
    pub pos: GeoPoint,
    /// Ground speed, m/s.  Set to 0 when the path is exhausted.
    pub speed_mps: f64,
    /// Radians from east, counter-clockwise.
    pub heading_rad: f64,
    pub accel_mps2: f64,
    pub active: bool,
    /// Neighbor cache, mirrored from the interference graph after each
    /// rebuild.
    pub neighbors: Vec<VehicleId>,

    tx_radius_m: f64,
    path: Vec<GeoPoint>,
    path_cursor: usize,
}

impl Vehicle {
    /// A stationary, active vehicle at `pos` with the default 300 m radius.
    pub fn new(id: VehicleId, pos: GeoPoint) -> Self {
        Self {
            id,
            pos,
            speed_mps: 0.0,
            heading_rad: 0.0,
            accel_mps2: 0.0,
            active: true,
            neighbors: Vec::new(),
            tx_radius_m: 300.0,
            path: Vec::new(),
            path_cursor: 0,
        }
    }

    // ── Transmission radius ───────────────────────────────────────────────

    pub fn tx_radius_m(&self) -> f64 {
        self.tx_radius_m
    }

    /// Set the transmission radius, clamped to [100, 500] m.
    pub fn set_tx_radius_m(&mut self, radius_m: f64) {
        self.tx_radius_m = radius_m.clamp(TX_RADIUS_MIN_M, TX_RADIUS_MAX_M);
    }

    /// Haversine distance to another vehicle, metres.
    pub fn distance_to(&self, other: &Vehicle) -> f64 {
        self.pos.distance_m(other.pos)
    }

    /// `true` when both vehicles are inside each other's transmission disk
    /// (the same rule the interference graph enforces globally).
    pub fn can_communicate_with(&self, other: &Vehicle) -> bool {
        let d = self.distance_to(other);
        d <= self.tx_radius_m && d <= other.tx_radius_m
    }

    // ── Path management ───────────────────────────────────────────────────

    /// Install a new path and rewind the cursor.
    pub fn set_path(&mut self, path: Vec<GeoPoint>) {
        self.path = path;
        self.path_cursor = 0;
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_cursor = 0;
    }

    /// `true` while there are path points left to visit.
    pub fn has_path(&self) -> bool {
        self.path_cursor < self.path.len()
    }

    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    /// Index of the next point the vehicle is steering toward; equals
    /// `path.len()` once the path is exhausted.
    pub fn path_cursor(&self) -> usize {
        self.path_cursor
    }

    // ── Kinematics ────────────────────────────────────────────────────────

    /// Advance by `dt` seconds.
    ///
    /// No-op while inactive or stopped, so an idle vehicle never drifts.
    pub fn advance(&mut self, dt: f64) {
        if !self.active || self.speed_mps <= 0.0 || dt <= 0.0 {
            return;
        }

        let step_deg = self.speed_mps * dt / METERS_PER_DEGREE;

        if self.path_cursor < self.path.len() {
            let target = self.path[self.path_cursor];
            let d_lon = target.lon - self.pos.lon;
            let d_lat = target.lat - self.pos.lat;
            let dist_deg = (d_lon * d_lon + d_lat * d_lat).sqrt();

            if dist_deg <= SNAP_FACTOR * step_deg {
                self.pos = target;
                self.path_cursor += 1;
                if self.path_cursor >= self.path.len() {
                    // Journey complete: idle until re-pathed.
                    self.speed_mps = 0.0;
                }
            } else {
                self.heading_rad = d_lat.atan2(d_lon);
                self.pos.lon += step_deg * d_lon / dist_deg;
                self.pos.lat += step_deg * d_lat / dist_deg;
            }
        } else {
            // Free flight along the current heading.
            self.pos.lon += step_deg * self.heading_rad.cos();
            self.pos.lat += step_deg * self.heading_rad.sin();
        }
    }
}
