//! Integration tests for the simulation engine.
//!
//! Everything runs on synthetic networks with fixed-`dt` stepping — no wall
//! clock, no OSM files, no nondeterminism beyond the injected seeds.

#[cfg(test)]
mod helpers {
    use v2v_core::GeoPoint;
    use v2v_road::{build_grid, RoadClass, RoadGraph};

    use crate::config::SimulationConfig;
    use crate::engine::SimulationEngine;

    pub const CENTER: GeoPoint = GeoPoint { lat: 47.7508, lon: 7.3359 };
    pub const DT: f64 = 1.0 / 30.0;

    /// Lossless, jitter-free channel so message assertions are exact.
    pub fn lossless_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.comm.packet_loss_rate = 0.0;
        config.comm.jitter_sigma_ms = 0.0;
        config
    }

    /// Engine over the standard 10×10 synthetic grid.
    pub fn grid_engine(seed: u64) -> SimulationEngine {
        let mut engine = SimulationEngine::new(lossless_config(), seed);
        engine.load_road_graph(build_grid(CENTER, 10, 500.0));
        engine
    }

    /// Two road nodes 100 m apart, connected both ways.
    pub fn two_node_graph() -> RoadGraph {
        let mut g = RoadGraph::new();
        let a = g.add_node(CENTER.lat, CENTER.lon);
        let far = CENTER.destination(100.0, 0.0);
        let b = g.add_node(far.lat, far.lon);
        let len = g.node_pos(a).distance_m(g.node_pos(b));
        g.add_segment(a, b, len, 13.9, RoadClass::Residential, "");
        g.build_spatial_index();
        g
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::helpers::{grid_engine, DT};
    use crate::engine::SimState;
    use crate::error::SimError;

    #[test]
    fn start_pause_resume_stop() {
        let mut engine = grid_engine(1);
        assert_eq!(engine.state(), SimState::Stopped);

        engine.start().unwrap();
        assert_eq!(engine.state(), SimState::Running);

        engine.step(DT);
        let frozen = engine.sim_time();
        assert!(frozen > 0.0);

        engine.pause().unwrap();
        assert_eq!(engine.state(), SimState::Paused);
        assert_eq!(engine.sim_time(), frozen, "pause freezes sim time");

        // Resume keeps the accumulated sim time.
        engine.start().unwrap();
        assert_eq!(engine.state(), SimState::Running);
        assert_eq!(engine.sim_time(), frozen);

        engine.stop().unwrap();
        assert_eq!(engine.state(), SimState::Stopped);
        assert_eq!(engine.sim_time(), 0.0, "stop rewinds sim time");
    }

    #[test]
    fn invalid_transitions_are_errors() {
        let mut engine = grid_engine(1);

        assert!(matches!(engine.pause(), Err(SimError::InvalidTransition { .. })));
        assert!(matches!(engine.stop(), Err(SimError::InvalidTransition { .. })));
        assert!(matches!(engine.tick(), Err(SimError::InvalidTransition { .. })));

        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(SimError::InvalidTransition { .. })));
    }

    #[test]
    fn tick_runs_only_while_running() {
        let mut engine = grid_engine(1);
        engine.start().unwrap();
        engine.tick().unwrap();
        engine.pause().unwrap();
        assert!(engine.tick().is_err());
    }

    #[test]
    fn reset_clears_the_world() {
        let mut engine = grid_engine(1);
        engine.set_vehicle_count(20);
        engine.start().unwrap();
        for _ in 0..30 {
            engine.step(DT);
        }

        engine.reset();
        assert_eq!(engine.sim_time(), 0.0);
        assert_eq!(engine.tick_count(), 0);
        assert!(engine.vehicles().is_empty());
        assert_eq!(engine.interference().link_count(), 0);
        assert_eq!(engine.interference().vehicle_count(), 0);
        assert_eq!(engine.statistics().sent, 0);
    }

    #[test]
    fn time_scale_and_fps_are_clamped() {
        let mut engine = grid_engine(1);
        engine.set_time_scale(100.0);
        assert_eq!(engine.time_scale(), 10.0);
        engine.set_time_scale(0.0);
        assert_eq!(engine.time_scale(), 0.1);
        engine.set_target_fps(10);
        assert_eq!(engine.target_fps(), 30);
        engine.set_target_fps(500);
        assert_eq!(engine.target_fps(), 120);
    }
}

// ── Population ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod population {
    use super::helpers::{grid_engine, lossless_config, CENTER};
    use crate::engine::SimulationEngine;

    #[test]
    fn routed_population_roots_on_vertices() {
        let mut engine = grid_engine(42);
        engine.set_vehicle_count(50);

        assert_eq!(engine.vehicles().len(), 50);
        for v in engine.vehicles() {
            // Every vehicle sits exactly on some grid vertex.
            let snapped = engine
                .road_graph()
                .nearest_node(v.pos.lat, v.pos.lon)
                .unwrap();
            assert!(engine.road_graph().node_pos(snapped).distance_m(v.pos) < 1.0);
            assert!((10.0..25.0).contains(&v.speed_mps));
            assert_eq!(v.tx_radius_m(), 300.0);
        }
    }

    #[test]
    fn routed_population_pre_plans_paths() {
        let mut engine = grid_engine(42);
        engine.set_vehicle_count(300);
        assert_eq!(engine.vehicles().len(), 300);

        // The grid is connected, so virtually every plan succeeds.
        let with_paths = engine.vehicles().iter().filter(|v| v.has_path()).count();
        assert!(with_paths >= 297, "only {with_paths}/300 vehicles have paths");
    }

    #[test]
    fn simple_mode_places_around_center() {
        // No road graph loaded: free-flight placement in a ±0.05° box.
        let mut engine = SimulationEngine::new(lossless_config(), 42);
        engine.set_vehicle_count(30);

        assert_eq!(engine.vehicles().len(), 30);
        for v in engine.vehicles() {
            assert!(v.pos.within_bbox(CENTER, 0.05));
            assert!((10.0..25.0).contains(&v.speed_mps));
            assert!(!v.has_path());
        }
    }

    #[test]
    fn repopulation_replaces_vehicles() {
        let mut engine = grid_engine(42);
        engine.set_vehicle_count(20);
        engine.set_vehicle_count(5);
        assert_eq!(engine.vehicles().len(), 5);
    }
}

// ── Communication integration ─────────────────────────────────────────────────

#[cfg(test)]
mod comms {
    use v2v_comm::{EventKind, MessageKind, Payload};
    use v2v_core::VehicleId;

    use super::helpers::{lossless_config, two_node_graph, DT};
    use crate::engine::SimulationEngine;

    fn two_vehicle_engine(seed: u64) -> SimulationEngine {
        let mut engine = SimulationEngine::new(lossless_config(), seed);
        engine.load_road_graph(two_node_graph());
        engine.set_vehicle_count(2);
        engine
    }

    #[test]
    fn moving_vehicles_exchange_awareness() {
        let mut engine = two_vehicle_engine(42);
        engine.start().unwrap();

        // 1 s of simulation: several CAM rounds at 5 Hz, 10 ms latency.
        for _ in 0..30 {
            engine.step(DT);
        }

        let received: usize = (0..2)
            .map(|i| engine.drain_inbox(VehicleId(i)).len())
            .sum();
        assert!(received > 0, "no awareness traffic between vehicles 100 m apart");
        assert!(engine.statistics().sent > 0);
        assert!(engine.statistics().received > 0);
    }

    #[test]
    fn received_messages_are_awareness() {
        let mut engine = two_vehicle_engine(42);
        engine.start().unwrap();
        for _ in 0..30 {
            engine.step(DT);
        }
        for i in 0..2 {
            for m in engine.drain_inbox(VehicleId(i)) {
                assert_eq!(m.kind(), MessageKind::Awareness);
                assert!(matches!(m.payload, Payload::Awareness { .. }));
                assert_ne!(m.sender(), VehicleId(i), "nobody hears their own CAM");
            }
        }
    }

    #[test]
    fn idle_vehicles_fall_silent() {
        let mut engine = two_vehicle_engine(42);
        engine.start().unwrap();

        // Run until every vehicle has exhausted its path (≤ 100 m at
        // ≥ 10 m/s, so 30 s is generous), then flush in-flight copies.
        for _ in 0..900 {
            engine.step(DT);
        }
        assert!(
            engine.vehicles().iter().all(|v| v.speed_mps == 0.0),
            "vehicles should be idle by now"
        );
        for _ in 0..30 {
            engine.step(DT);
        }
        for i in 0..2 {
            engine.drain_inbox(VehicleId(i));
        }

        // Another second of ticks: idle vehicles must not emit awareness.
        for _ in 0..30 {
            engine.step(DT);
        }
        for i in 0..2 {
            assert!(
                engine.drain_inbox(VehicleId(i)).is_empty(),
                "idle vehicle received fresh awareness traffic"
            );
        }
    }

    #[test]
    fn reported_event_reaches_neighbors() {
        let mut engine = two_vehicle_engine(42);
        engine.start().unwrap();
        engine.step(DT); // build the interference graph

        let scheduled = engine.report_event(VehicleId(0), EventKind::Accident, "pileup");
        assert_eq!(scheduled, 1);

        for _ in 0..3 {
            engine.step(DT);
        }
        let inbox = engine.drain_inbox(VehicleId(1));
        let denm: Vec<_> = inbox.iter().filter(|m| m.kind() == MessageKind::Event).collect();
        assert_eq!(denm.len(), 1);
        assert!(denm[0].to_string().contains("event=Accident"));
    }

    #[test]
    fn event_from_unknown_vehicle_is_refused() {
        let mut engine = two_vehicle_engine(42);
        assert_eq!(engine.report_event(VehicleId(99), EventKind::Jam, ""), 0);
    }

    #[test]
    fn neighbor_caches_mirror_interference_graph() {
        let mut engine = two_vehicle_engine(42);
        engine.start().unwrap();
        engine.step(DT);

        for v in engine.vehicles() {
            let mut cached = v.neighbors.clone();
            let mut live = engine.interference().neighbors(v.id);
            cached.sort();
            live.sort();
            assert_eq!(cached, live);
        }
    }
}

// ── Determinism ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod determinism {
    use super::helpers::{grid_engine, DT};

    /// Full kinematic trace of a run: (lat, lon, speed) per vehicle per tick.
    fn trace(seed: u64, ticks: usize) -> Vec<(f64, f64, f64)> {
        let mut engine = grid_engine(seed);
        engine.set_vehicle_count(40);
        engine.start().unwrap();

        let mut out = Vec::with_capacity(ticks * 40);
        for _ in 0..ticks {
            engine.step(DT);
            for v in engine.vehicles() {
                out.push((v.pos.lat, v.pos.lon, v.speed_mps));
            }
        }
        out
    }

    #[test]
    fn identical_seeds_replay_bit_for_bit() {
        assert_eq!(trace(7, 300), trace(7, 300));
    }

    #[test]
    fn different_seeds_diverge() {
        assert_ne!(trace(7, 50), trace(8, 50));
    }
}

// ── Observers ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::helpers::{two_node_graph, lossless_config, DT};
    use crate::engine::{SimState, SimulationEngine};
    use crate::observer::{SimObserver, TickView};

    #[derive(Default)]
    struct Counters {
        ticks: AtomicUsize,
        transmitted: AtomicUsize,
        state_changes: AtomicUsize,
    }

    struct Counting(Arc<Counters>);

    impl SimObserver for Counting {
        fn on_tick(&mut self, view: &TickView<'_>) {
            self.0.ticks.fetch_add(1, Ordering::SeqCst);
            // The view is the post-tick state: tick counter is never 0 here.
            assert!(view.tick.0 > 0);
        }
        fn on_transmitted(
            &mut self,
            _s: v2v_core::VehicleId,
            _r: v2v_core::VehicleId,
            _k: v2v_comm::MessageKind,
        ) {
            self.0.transmitted.fetch_add(1, Ordering::SeqCst);
        }
        fn on_state_changed(&mut self, _state: SimState) {
            self.0.state_changes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn observers_see_ticks_and_traffic() {
        let counters = Arc::new(Counters::default());
        let mut engine = SimulationEngine::new(lossless_config(), 42);
        engine.load_road_graph(two_node_graph());
        engine.set_vehicle_count(2);
        engine.add_observer(Box::new(Counting(Arc::clone(&counters))));

        engine.start().unwrap();
        for _ in 0..30 {
            engine.step(DT);
        }
        engine.stop().unwrap();

        assert_eq!(counters.ticks.load(Ordering::SeqCst), 30);
        assert!(counters.transmitted.load(Ordering::SeqCst) > 0);
        // start + stop
        assert_eq!(counters.state_changes.load(Ordering::SeqCst), 2);
    }
}

// ── Config adapter ────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use crate::config::ConfigFile;

    const SAMPLE: &str = r#"{
        "simulation": {
            "initial_vehicles": 200,
            "time_acceleration": 2.5,
            "target_fps": 60,
            "transmission_radius_m": 150
        },
        "communication": {
            "packet_loss_rate": 0.1,
            "base_latency_ms": 20.0
        },
        "map": {
            "center": { "lat": 47.7508, "lon": 7.3359 },
            "osm_file": "mulhouse.osm.pbf"
        }
    }"#;

    #[test]
    fn typed_getters() {
        let cfg = ConfigFile::parse(SAMPLE).unwrap();
        assert_eq!(cfg.get_i64("simulation.initial_vehicles", 0), 200);
        assert_eq!(cfg.get_f64("simulation.time_acceleration", 0.0), 2.5);
        assert_eq!(cfg.get_f64("map.center.lat", 0.0), 47.7508);
        assert_eq!(cfg.get_str("map.osm_file", ""), "mulhouse.osm.pbf");
        assert!(cfg.has("communication.packet_loss_rate"));
        assert!(!cfg.has("communication.jitter_sigma_ms"));
    }

    #[test]
    fn missing_keys_use_defaults() {
        let cfg = ConfigFile::parse("{}").unwrap();
        assert_eq!(cfg.get_i64("simulation.initial_vehicles", 50), 50);
        assert_eq!(cfg.get_bool("nonexistent.flag", true), true);
        assert_eq!(cfg.get_str("nonexistent.name", "fallback"), "fallback");
    }

    #[test]
    fn structured_view_applies_defaults_and_clamps() {
        let cfg = ConfigFile::parse(SAMPLE).unwrap();
        let sim = cfg.simulation();
        assert_eq!(sim.initial_vehicles, 200);
        assert_eq!(sim.time_acceleration, 2.5);
        assert_eq!(sim.target_fps, 60);
        assert_eq!(sim.transmission_radius_m, 150.0);
        // Defaults for omitted keys:
        assert_eq!(sim.interference_interval_ticks, 10);
        assert_eq!(sim.cam_hz, 5.0);
        assert_eq!(sim.comm.jitter_sigma_ms, 2.0);
        assert_eq!(sim.comm.max_age_s, 5.0);
        // Provided comm keys:
        assert_eq!(sim.comm.packet_loss_rate, 0.1);
        assert_eq!(sim.comm.base_latency_ms, 20.0);
        assert_eq!(sim.osm_file.as_deref(), Some(std::path::Path::new("mulhouse.osm.pbf")));
    }

    #[test]
    fn map_view() {
        let cfg = ConfigFile::parse(SAMPLE).unwrap();
        let map = cfg.map();
        assert_eq!(map.center.lat, 47.7508);
        assert_eq!(map.center.lon, 7.3359);
        assert_eq!(map.zoom, 13, "zoom falls back to its default");
        assert_eq!(
            map.osm_file.as_deref(),
            Some(std::path::Path::new("mulhouse.osm.pbf"))
        );
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = ConfigFile::parse(
            r#"{"simulation": {"time_acceleration": 99.0, "target_fps": 500},
                "communication": {"packet_loss_rate": 1.5}}"#,
        )
        .unwrap();
        let sim = cfg.simulation();
        assert_eq!(sim.time_acceleration, 10.0);
        assert_eq!(sim.target_fps, 120);
        assert_eq!(sim.comm.packet_loss_rate, 1.0);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(ConfigFile::parse("{not json").is_err());
    }
}
