//! Configuration: the engine's parameter struct and the JSON file adapter.
//!
//! The adapter is a read-only mapping with typed getters over dotted key
//! paths.  Missing or mistyped options fall back to their documented
//! defaults with a warning — absent configuration never aborts a run.

use std::path::{Path, PathBuf};

use log::warn;
use serde_json::Value;

use v2v_comm::CommConfig;
use v2v_core::GeoPoint;

use crate::error::{SimError, SimResult};

// ── Bounds ────────────────────────────────────────────────────────────────────

pub const TIME_SCALE_MIN: f64 = 0.1;
pub const TIME_SCALE_MAX: f64 = 10.0;
pub const TARGET_FPS_MIN: u32 = 30;
pub const TARGET_FPS_MAX: u32 = 120;

// ── SimulationConfig ──────────────────────────────────────────────────────────

/// Engine parameters, typically produced by [`ConfigFile::simulation`].
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Population created when the application calls `set_vehicle_count`
    /// with no explicit count.
    pub initial_vehicles: usize,
    /// Wall-to-sim time factor, clamped to [0.1, 10].
    pub time_acceleration: f64,
    /// Tick frequency target, clamped to [30, 120].
    pub target_fps: u32,
    /// Transmission radius assigned to created vehicles, metres.
    pub transmission_radius_m: f64,
    /// Ticks between interference-graph rebuilds.
    pub interference_interval_ticks: u32,
    /// Awareness broadcast frequency, Hz.
    pub cam_hz: f64,
    /// Channel model parameters.
    pub comm: CommConfig,
    /// Map centre: fallback-grid anchor and simple-mode placement centre.
    pub map_center: GeoPoint,
    /// Optional OSM input file.
    pub osm_file: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_vehicles: 50,
            time_acceleration: 1.0,
            target_fps: 30,
            transmission_radius_m: 300.0,
            interference_interval_ticks: 10,
            cam_hz: 5.0,
            comm: CommConfig::default(),
            map_center: GeoPoint::new(47.7508, 7.3359),
            osm_file: None,
        }
    }
}

// ── MapConfig ─────────────────────────────────────────────────────────────────

/// Map view parameters, consumed by external renderers and the OSM loader.
#[derive(Clone, Debug)]
pub struct MapConfig {
    pub center: GeoPoint,
    /// Slippy-map zoom level of the initial viewport.
    pub zoom: u8,
    pub osm_file: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(47.7508, 7.3359),
            zoom: 13,
            osm_file: None,
        }
    }
}

// ── ConfigFile ────────────────────────────────────────────────────────────────

/// A loaded JSON configuration document.
pub struct ConfigFile {
    root: Value,
}

impl ConfigFile {
    /// Parse a JSON config file.
    pub fn load(path: &Path) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a JSON config document from memory.
    pub fn parse(text: &str) -> SimResult<Self> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| SimError::Config(e.to_string()))?;
        Ok(Self { root })
    }

    /// Resolve a dotted key path (`"map.center.lat"`) to a JSON value.
    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut cur = &self.root;
        for part in key.split('.') {
            cur = cur.get(part)?;
        }
        Some(cur)
    }

    fn missing<T>(key: &str, default: T) -> T
    where
        T: std::fmt::Debug,
    {
        warn!("config option '{key}' missing or mistyped; using {default:?}");
        default
    }

    // ── Typed getters ─────────────────────────────────────────────────────

    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.lookup(key).and_then(Value::as_str) {
            Some(s) => s.to_owned(),
            None => Self::missing(key, default.to_owned()),
        }
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        match self.lookup(key).and_then(Value::as_i64) {
            Some(v) => v,
            None => Self::missing(key, default),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.lookup(key).and_then(Value::as_f64) {
            Some(v) => v,
            None => Self::missing(key, default),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.lookup(key).and_then(Value::as_bool) {
            Some(v) => v,
            None => Self::missing(key, default),
        }
    }

    /// `true` when the key exists with the right type (no warning emitted).
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    // ── Structured views ──────────────────────────────────────────────────

    /// The map view: centre, zoom and optional OSM file.
    pub fn map(&self) -> MapConfig {
        let d = MapConfig::default();
        MapConfig {
            center: GeoPoint::new(
                self.get_f64("map.center.lat", d.center.lat),
                self.get_f64("map.center.lon", d.center.lon),
            ),
            zoom: self.get_i64("map.zoom", d.zoom as i64).clamp(0, 19) as u8,
            osm_file: self
                .lookup("map.osm_file")
                .and_then(Value::as_str)
                .map(PathBuf::from),
        }
    }

    /// The full engine parameter set, with defaults and clamps applied.
    pub fn simulation(&self) -> SimulationConfig {
        let d = SimulationConfig::default();
        let osm_file = self
            .lookup("map.osm_file")
            .and_then(Value::as_str)
            .map(PathBuf::from);

        SimulationConfig {
            initial_vehicles: self
                .get_i64("simulation.initial_vehicles", d.initial_vehicles as i64)
                .max(0) as usize,
            time_acceleration: self
                .get_f64("simulation.time_acceleration", d.time_acceleration)
                .clamp(TIME_SCALE_MIN, TIME_SCALE_MAX),
            target_fps: (self.get_i64("simulation.target_fps", d.target_fps as i64) as u32)
                .clamp(TARGET_FPS_MIN, TARGET_FPS_MAX),
            transmission_radius_m: self
                .get_i64("simulation.transmission_radius_m", d.transmission_radius_m as i64)
                as f64,
            interference_interval_ticks: self
                .get_i64(
                    "simulation.interference_interval_ticks",
                    d.interference_interval_ticks as i64,
                )
                .max(1) as u32,
            cam_hz: self.get_f64("simulation.cam_hz", d.cam_hz),
            comm: CommConfig {
                packet_loss_rate: self
                    .get_f64("communication.packet_loss_rate", d.comm.packet_loss_rate)
                    .clamp(0.0, 1.0),
                base_latency_ms: self
                    .get_f64("communication.base_latency_ms", d.comm.base_latency_ms),
                jitter_sigma_ms: self
                    .get_f64("communication.jitter_sigma_ms", d.comm.jitter_sigma_ms),
                max_age_s: self.get_f64("communication.max_age_s", d.comm.max_age_s),
            },
            map_center: GeoPoint::new(
                self.get_f64("map.center.lat", d.map_center.lat),
                self.get_f64("map.center.lon", d.map_center.lon),
            ),
            osm_file,
        }
    }
}
