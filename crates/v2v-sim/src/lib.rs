//! `v2v-sim` — the tick-loop orchestrator of the simulator.
//!
//! # Tick procedure
//!
//! ```text
//! step(dt):
//!   ① Advance    — every vehicle integrates dt of movement.
//!   ② Links      — every `interference_interval` ticks, snapshot positions,
//!                  rebuild the interference graph, mirror neighbor sets.
//!   ③ Comms      — awareness broadcasts on the CAM cadence, then flush the
//!                  delay line and age inboxes.
//!   ④ Notify     — observers read the consistent post-tick state.
//! ```
//!
//! `step(dt)` is the deterministic core; `tick()` wraps it with wall-clock
//! `dt` measurement, the time-scale factor and FPS bookkeeping.  Everything
//! runs on the calling thread — readers outside it must use the views
//! between ticks.

pub mod config;
pub mod engine;
pub mod error;
pub mod observer;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{ConfigFile, MapConfig, SimulationConfig};
pub use engine::{SimState, SimulationEngine};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver, TickView};
