//! The simulation engine: lifecycle, tick loop and population management.

use std::time::{Duration, Instant};

use log::{info, warn};

use v2v_comm::{
    CommConfig, CommManager, CommObserver, CommStats, DropReason, EventKind, Message,
    MessageIds, MessageKind, DEFAULT_EVENT_TTL_S,
};
use v2v_core::{GeoPoint, SimClock, SimRng, VehicleId};
use v2v_net::{InterferenceGraph, VehiclePoint};
use v2v_road::{AStarPlanner, RoadGraph};
use v2v_vehicle::Vehicle;

use crate::config::{SimulationConfig, TARGET_FPS_MAX, TARGET_FPS_MIN, TIME_SCALE_MAX, TIME_SCALE_MIN};
use crate::error::{SimError, SimResult};
use crate::observer::{SimObserver, TickView};

/// Wall-clock budget for one population-creation call.
const POPULATION_BUDGET: Duration = Duration::from_secs(60);

/// Minimum random-path length requested for created vehicles, metres.
const MIN_PATH_LENGTH_M: f64 = 500.0;

/// Speed range assigned to created vehicles, m/s (36–90 km/h).
const SPEED_RANGE_MPS: std::ops::Range<f64> = 10.0..25.0;

/// Half-width of the simple-mode placement box around the map centre, degrees.
const SIMPLE_MODE_HALF_DEG: f64 = 0.05;

// ── SimState ──────────────────────────────────────────────────────────────────

/// Engine lifecycle state.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum SimState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl SimState {
    pub fn as_str(self) -> &'static str {
        match self {
            SimState::Stopped => "stopped",
            SimState::Running => "running",
            SimState::Paused => "paused",
        }
    }
}

impl std::fmt::Display for SimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── FPS tracking ──────────────────────────────────────────────────────────────

/// Rolling frame-rate estimate over half-second windows.
struct FpsCounter {
    frames: u32,
    window_start: Option<Instant>,
    current: f64,
}

impl FpsCounter {
    fn new() -> Self {
        Self { frames: 0, window_start: None, current: 0.0 }
    }

    fn frame(&mut self, now: Instant) {
        self.frames += 1;
        match self.window_start {
            None => self.window_start = Some(now),
            Some(start) => {
                let elapsed = (now - start).as_secs_f64();
                if elapsed >= 0.5 {
                    self.current = self.frames as f64 / elapsed;
                    self.frames = 0;
                    self.window_start = Some(now);
                }
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

// ── Observer fan-out ──────────────────────────────────────────────────────────

/// Forwards communication hooks to every registered engine observer.
struct Fanout<'a>(&'a mut [Box<dyn SimObserver>]);

impl CommObserver for Fanout<'_> {
    fn on_transmitted(&mut self, sender: VehicleId, receiver: VehicleId, kind: MessageKind) {
        for obs in self.0.iter_mut() {
            obs.on_transmitted(sender, receiver, kind);
        }
    }

    fn on_dropped(&mut self, sender: VehicleId, reason: DropReason) {
        for obs in self.0.iter_mut() {
            obs.on_dropped(sender, reason);
        }
    }
}

// ── SimulationEngine ──────────────────────────────────────────────────────────

/// Owns the world: vehicles, road graph, interference graph, communication
/// manager, RNG and observers.  All mutation happens on the calling thread;
/// within a tick the engine runs to completion.
pub struct SimulationEngine {
    config: SimulationConfig,
    state: SimState,
    clock: SimClock,

    time_scale: f64,
    target_fps: u32,

    vehicles: Vec<Vehicle>,
    graph: RoadGraph,
    planner: AStarPlanner,
    interference: InterferenceGraph,
    comm: CommManager,
    ids: MessageIds,
    rng: SimRng,

    last_cam_time: f64,
    last_tick_wall: Option<Instant>,
    fps: FpsCounter,

    observers: Vec<Box<dyn SimObserver>>,
}

impl SimulationEngine {
    /// Build an engine from its configuration and a master seed.  The same
    /// seed and the same fixed-`dt` stepping reproduce a run exactly.
    ///
    /// A channel configuration outside its domain is replaced by the
    /// defaults with a warning; construction itself never fails.
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        let comm_config = match config.comm.validate() {
            Ok(()) => config.comm.clone(),
            Err(e) => {
                warn!("communication config rejected ({e}); using defaults");
                CommConfig::default()
            }
        };
        let comm = CommManager::new(comm_config);
        let time_scale = config.time_acceleration.clamp(TIME_SCALE_MIN, TIME_SCALE_MAX);
        let target_fps = config.target_fps.clamp(TARGET_FPS_MIN, TARGET_FPS_MAX);
        Self {
            time_scale,
            target_fps,
            state: SimState::Stopped,
            clock: SimClock::new(),
            vehicles: Vec::new(),
            graph: RoadGraph::new(),
            planner: AStarPlanner::new(),
            interference: InterferenceGraph::new(),
            comm,
            ids: MessageIds::new(),
            rng: SimRng::new(seed),
            last_cam_time: 0.0,
            last_tick_wall: None,
            fps: FpsCounter::new(),
            observers: Vec::new(),
            config,
        }
    }

    // ── Read-only views ───────────────────────────────────────────────────

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn sim_time(&self) -> f64 {
        self.clock.sim_time
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick.0
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Rolling wall-clock frame rate (0 until `tick` has run for 0.5 s).
    pub fn fps(&self) -> f64 {
        self.fps.current
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn active_vehicle_count(&self) -> usize {
        self.vehicles.iter().filter(|v| v.active).count()
    }

    pub fn road_graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn interference(&self) -> &InterferenceGraph {
        &self.interference
    }

    pub fn statistics(&self) -> &CommStats {
        self.comm.stats()
    }

    // ── Configuration ─────────────────────────────────────────────────────

    /// Install a loaded road graph.  Subsequent population creation routes
    /// on it; without one the engine runs in free-flight "simple mode".
    pub fn load_road_graph(&mut self, graph: RoadGraph) {
        info!(
            "road graph loaded: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        self.graph = graph;
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.clamp(TIME_SCALE_MIN, TIME_SCALE_MAX);
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps.clamp(TARGET_FPS_MIN, TARGET_FPS_MAX);
    }

    /// Register a tick/communication observer.
    pub fn add_observer(&mut self, observer: Box<dyn SimObserver>) {
        self.observers.push(observer);
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// `Stopped → Running` (fresh run) or `Paused → Running` (resume without
    /// resetting sim time).
    pub fn start(&mut self) -> SimResult<()> {
        match self.state {
            SimState::Running => Err(SimError::InvalidTransition { action: "start", state: self.state }),
            SimState::Stopped | SimState::Paused => {
                self.state = SimState::Running;
                self.last_tick_wall = None;
                self.notify_state();
                info!("simulation started ({})", self.clock);
                Ok(())
            }
        }
    }

    /// `Running → Paused`; sim time freezes, nothing is discarded.
    pub fn pause(&mut self) -> SimResult<()> {
        if self.state != SimState::Running {
            return Err(SimError::InvalidTransition { action: "pause", state: self.state });
        }
        self.state = SimState::Paused;
        self.notify_state();
        info!("simulation paused at {}", self.clock);
        Ok(())
    }

    /// Any running state → `Stopped`; sim time rewinds to 0.
    pub fn stop(&mut self) -> SimResult<()> {
        if self.state == SimState::Stopped {
            return Err(SimError::InvalidTransition { action: "stop", state: self.state });
        }
        self.state = SimState::Stopped;
        self.clock.reset();
        self.comm.rewind_clock();
        self.last_cam_time = 0.0;
        self.last_tick_wall = None;
        self.fps.reset();
        self.notify_state();
        info!("simulation stopped");
        Ok(())
    }

    /// Stop and discard the world: vehicles, links, in-flight deliveries,
    /// inboxes and statistics.
    pub fn reset(&mut self) {
        if self.state != SimState::Stopped {
            let _ = self.stop();
        }
        self.vehicles.clear();
        self.interference.clear();
        self.comm.clear();
        self.comm.reset_statistics();
        self.clock.reset();
        self.last_cam_time = 0.0;
        info!("simulation reset");
    }

    fn notify_state(&mut self) {
        let state = self.state;
        for obs in &mut self.observers {
            obs.on_state_changed(state);
        }
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Replace the population with `count` vehicles.
    ///
    /// With a loaded road graph, vehicles are rooted at random vertices and
    /// their paths are planned up-front — pre-planning eliminates per-tick
    /// planner calls and the associated jitter.  The whole operation runs
    /// under a 60 s wall budget; on exhaustion the engine accepts a partial
    /// population and logs the shortfall.  Without a graph, vehicles free-fly
    /// in a box around the map centre (smoke-test mode).
    pub fn set_vehicle_count(&mut self, count: usize) {
        self.vehicles.clear();
        if self.graph.node_count() == 0 {
            self.create_simple_population(count);
        } else {
            self.create_routed_population(count);
        }
    }

    fn create_simple_population(&mut self, count: usize) {
        let center = self.config.map_center;
        for i in 0..count {
            let lat = center.lat + self.rng.gen_range(-SIMPLE_MODE_HALF_DEG..SIMPLE_MODE_HALF_DEG);
            let lon = center.lon + self.rng.gen_range(-SIMPLE_MODE_HALF_DEG..SIMPLE_MODE_HALF_DEG);
            let mut v = Vehicle::new(VehicleId(i as u32), GeoPoint::new(lat, lon));
            v.speed_mps = self.rng.gen_range(SPEED_RANGE_MPS);
            v.heading_rad = self.rng.gen_range(0.0..std::f64::consts::TAU);
            v.set_tx_radius_m(self.config.transmission_radius_m);
            self.vehicles.push(v);
        }
        info!("created {count} vehicles (simple mode)");
    }

    fn create_routed_population(&mut self, count: usize) {
        let started = Instant::now();
        let node_count = self.graph.node_count() as u32;

        for i in 0..count {
            if i % 10 == 0 && started.elapsed() > POPULATION_BUDGET {
                warn!(
                    "vehicle creation budget exhausted after {:.1} s: {}/{count} created",
                    started.elapsed().as_secs_f64(),
                    self.vehicles.len()
                );
                break;
            }
            let node = v2v_core::NodeId(self.rng.gen_range(0..node_count));
            let mut v = Vehicle::new(VehicleId(i as u32), self.graph.node_pos(node));
            v.speed_mps = self.rng.gen_range(SPEED_RANGE_MPS);
            v.set_tx_radius_m(self.config.transmission_radius_m);
            self.vehicles.push(v);
        }

        let mut planned = 0usize;
        let mut failed = 0usize;
        for v in &mut self.vehicles {
            if started.elapsed() > POPULATION_BUDGET {
                warn!(
                    "path planning budget exhausted: {planned} planned, {} vehicles left pathless",
                    self.vehicles.len() - planned - failed
                );
                break;
            }
            match self
                .planner
                .random_path(&self.graph, &mut self.rng, v.pos, MIN_PATH_LENGTH_M)
            {
                Ok(path) => {
                    v.set_path(path);
                    planned += 1;
                }
                // Transient planner failure: the vehicle idles until re-pathed.
                Err(_) => failed += 1,
            }
        }

        info!(
            "population ready: {} vehicles, {planned} paths planned, {failed} failed in {:.2} s",
            self.vehicles.len(),
            started.elapsed().as_secs_f64()
        );
    }

    // ── Messaging API ─────────────────────────────────────────────────────

    /// Broadcast a high-priority event from `sender`'s current position.
    /// Returns the number of copies scheduled (0 for unknown senders).
    pub fn report_event(&mut self, sender: VehicleId, kind: EventKind, text: &str) -> usize {
        let Some(pos) = self
            .vehicles
            .iter()
            .find(|v| v.id == sender && v.active)
            .map(|v| v.pos)
        else {
            return 0;
        };
        let message = Message::event(
            &mut self.ids,
            sender,
            self.clock.sim_time,
            kind,
            pos,
            text,
            DEFAULT_EVENT_TTL_S,
        );

        let mut observers = std::mem::take(&mut self.observers);
        let scheduled = self.comm.broadcast(
            &self.interference,
            message,
            0,
            &mut self.rng,
            &mut Fanout(&mut observers),
        );
        self.observers = observers;
        scheduled
    }

    /// Take every delivered-but-unread message for `vehicle`.  Destructive.
    pub fn drain_inbox(&mut self, vehicle: VehicleId) -> Vec<Message> {
        self.comm.drain_inbox(vehicle)
    }

    // ── Tick loop ─────────────────────────────────────────────────────────

    /// One wall-clock-driven tick.  Requires `Running`; applies the time
    /// scale to the measured wall `dt` and updates the FPS estimate.
    pub fn tick(&mut self) -> SimResult<()> {
        if self.state != SimState::Running {
            return Err(SimError::InvalidTransition { action: "tick", state: self.state });
        }

        let now = Instant::now();
        let wall_dt = match self.last_tick_wall {
            Some(prev) => (now - prev).as_secs_f64(),
            // First tick after start/resume: assume one nominal frame.
            None => 1.0 / self.target_fps as f64,
        };
        self.last_tick_wall = Some(now);

        self.step(wall_dt * self.time_scale);
        self.fps.frame(now);
        Ok(())
    }

    /// The deterministic tick core: advance by exactly `dt` simulated
    /// seconds.  Tests and headless drivers call this directly with a fixed
    /// `dt`; [`tick`](Self::tick) wraps it for real-time use.
    pub fn step(&mut self, dt: f64) {
        // ── Phase 1: advance every vehicle ────────────────────────────────
        for v in &mut self.vehicles {
            v.advance(dt);
        }

        // ── Phase 2: refresh the interference graph on its cadence ────────
        let interval = self.config.interference_interval_ticks.max(1) as u64;
        if self.clock.tick.0 % interval == 0 {
            let snapshot: Vec<VehiclePoint> = self
                .vehicles
                .iter()
                .filter(|v| v.active)
                .map(|v| VehiclePoint { id: v.id, pos: v.pos, tx_radius_m: v.tx_radius_m() })
                .collect();
            self.interference.rebuild(&snapshot);

            // Mirror the fresh neighbor sets into the vehicles' caches.
            for v in &mut self.vehicles {
                v.neighbors = self.interference.neighbors(v.id);
            }
        }

        // ── Phase 3: communication step ───────────────────────────────────
        //
        // The clock advances first so CAM stamps, delivery schedules and the
        // manager's clock all agree on "now".
        self.clock.advance(dt);

        let mut observers = std::mem::take(&mut self.observers);
        {
            let mut fan = Fanout(&mut observers);

            if self.clock.sim_time - self.last_cam_time >= 1.0 / self.config.cam_hz {
                self.last_cam_time = self.clock.sim_time;
                for i in 0..self.vehicles.len() {
                    let v = &self.vehicles[i];
                    // Idle vehicles (path exhausted, speed 0) stay silent.
                    if !v.active || v.speed_mps <= 0.0 {
                        continue;
                    }
                    let cam = Message::awareness(
                        &mut self.ids,
                        v.id,
                        self.clock.sim_time,
                        v.pos,
                        v.speed_mps,
                        v.heading_rad,
                        v.accel_mps2,
                    );
                    self.comm
                        .broadcast(&self.interference, cam, 0, &mut self.rng, &mut fan);
                }
            }

            self.comm.update(dt, &self.interference, &mut fan);
        }

        // ── Phase 4: publish the post-tick state ──────────────────────────
        let view = TickView {
            tick: self.clock.tick,
            sim_time: self.clock.sim_time,
            vehicles: &self.vehicles,
            interference: &self.interference,
            stats: self.comm.stats(),
            fps: self.fps.current,
        };
        for obs in &mut observers {
            obs.on_tick(&view);
        }
        self.observers = observers;
    }
}
