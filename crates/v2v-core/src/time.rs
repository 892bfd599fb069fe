//! Simulation time model.
//!
//! # Design
//!
//! Simulation time is continuous: the engine accumulates scaled wall `dt`
//! seconds into `sim_time`, and a `Tick` counter records how many loop
//! iterations have run.  Message delivery times, CAM cadence and statistics
//! windows are all expressed in `sim_time` seconds, which makes fixed-`dt`
//! replays bit-for-bit reproducible — a wall clock never leaks into the core.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// A simulation loop iteration counter.
///
/// Stored as `u64`: at 30 Hz a `u64` lasts ~19 billion years.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Accumulated simulation time plus the tick counter.
///
/// `SimClock` is cheap to copy and holds no heap data.  `sim_time` is the
/// total of every `dt` passed to [`advance`](Self::advance) since the last
/// [`reset`](Self::reset) — independent of wall time by construction.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Accumulated simulated seconds since start/reset.
    pub sim_time: f64,
    /// Completed loop iterations since start/reset.
    pub tick: Tick,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick of `dt` simulated seconds.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        self.sim_time += dt;
        self.tick = Tick(self.tick.0 + 1);
    }

    /// Rewind to the initial state (`stop`/`reset` semantics).
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3} s)", self.tick, self.sim_time)
    }
}
