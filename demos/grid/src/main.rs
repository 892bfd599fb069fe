//! grid — smallest end-to-end run of the rust_v2v simulator.
//!
//! Simulates a vehicle population commuting across the synthetic 10×10 grid
//! (500 m blocks around Mulhouse), exchanging awareness messages over a
//! lossy DSRC-like channel.  Swap the grid for a real OSM extract (`osm`
//! feature of `v2v-road`) to run at city scale.

use std::time::Instant;

use anyhow::Result;

use v2v_comm::EventKind;
use v2v_core::{GeoPoint, VehicleId};
use v2v_road::build_grid;
use v2v_sim::{SimulationConfig, SimulationEngine};

// ── Constants ─────────────────────────────────────────────────────────────────

const VEHICLES: usize = 500;
const SEED: u64 = 42;
const TICKS: u64 = 900; // 30 s of simulation at 30 Hz
const DT: f64 = 1.0 / 30.0;
const CENTER: GeoPoint = GeoPoint { lat: 47.7508, lon: 7.3359 };

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();

    println!("=== grid — rust_v2v simulator ===");
    println!("Vehicles: {VEHICLES}  |  Ticks: {TICKS}  |  Seed: {SEED}");
    println!();

    // 1. Build the road network.
    let network = build_grid(CENTER, 10, 500.0);
    println!(
        "Road network: {} nodes, {} edges",
        network.node_count(),
        network.edge_count()
    );

    // 2. Build the engine and population (paths are pre-planned here).
    let mut engine = SimulationEngine::new(SimulationConfig::default(), SEED);
    engine.load_road_graph(network);

    let t0 = Instant::now();
    engine.set_vehicle_count(VEHICLES);
    println!(
        "Population of {} ready in {:.2} s",
        engine.vehicles().len(),
        t0.elapsed().as_secs_f64()
    );
    println!();

    // 3. Run.
    engine.start()?;
    let t1 = Instant::now();
    for tick in 0..TICKS {
        engine.step(DT);

        // Halfway through, vehicle 0 reports an accident to its neighbors.
        if tick == TICKS / 2 {
            let copies = engine.report_event(VehicleId(0), EventKind::Accident, "demo pileup");
            println!("tick {tick}: vehicle 0 reported an accident ({copies} copies scheduled)");
        }
    }
    let elapsed = t1.elapsed();

    // 4. Summary.
    let stats = engine.statistics();
    println!();
    println!("Simulated {:.1} s in {:.3} s wall", engine.sim_time(), elapsed.as_secs_f64());
    println!();
    println!("{:<28} {:>12}", "Messages sent", stats.sent);
    println!("{:<28} {:>12}", "Copies received", stats.received);
    println!("{:<28} {:>12}", "Copies dropped", stats.dropped);
    println!("{:<28} {:>12}", "  CAM sent", stats.awareness_sent);
    println!("{:<28} {:>12}", "  DENM sent", stats.event_sent);
    println!("{:<28} {:>12.2}", "Latency avg (ms)", stats.latency_avg_ms);
    println!("{:<28} {:>12}", "Active links", stats.active_links);
    println!("{:<28} {:>12.2}", "Avg neighbors", stats.avg_neighbors);
    println!("{:<28} {:>12.1}", "Throughput (msg/s)", stats.throughput_msgs_per_s);
    println!();

    // 5. A few vehicles, post-run.
    println!("{:<10} {:<24} {:>8} {:>10}", "Vehicle", "Position", "Speed", "Neighbors");
    println!("{}", "-".repeat(56));
    for v in engine.vehicles().iter().take(8) {
        println!(
            "{:<10} {:<24} {:>8.1} {:>10}",
            v.id.0,
            format!("({:.5}, {:.5})", v.pos.lat, v.pos.lon),
            v.speed_mps,
            v.neighbors.len()
        );
    }

    engine.stop()?;
    Ok(())
}
