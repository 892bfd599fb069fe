//! Engine observer trait for renderers, metrics exporters and tests.

use v2v_comm::{CommStats, DropReason, MessageKind};
use v2v_core::{Tick, VehicleId};
use v2v_net::InterferenceGraph;
use v2v_vehicle::Vehicle;

use crate::engine::SimState;

/// Read-only snapshot handed to [`SimObserver::on_tick`] at the end of each
/// tick.  Everything it borrows is the consistent post-tick state.
pub struct TickView<'a> {
    pub tick: Tick,
    pub sim_time: f64,
    pub vehicles: &'a [Vehicle],
    pub interference: &'a InterferenceGraph,
    pub stats: &'a CommStats,
    /// Rolling wall-clock frame rate; 0 while stepping without a wall clock.
    pub fps: f64,
}

/// Callbacks invoked by the engine on its own thread.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Handlers must not block — they run
/// inside the tick.
pub trait SimObserver {
    /// End of tick; the view is the consistent post-tick state.
    fn on_tick(&mut self, _view: &TickView<'_>) {}

    /// A message copy was deposited in `receiver`'s inbox.
    fn on_transmitted(&mut self, _sender: VehicleId, _receiver: VehicleId, _kind: MessageKind) {}

    /// A message copy was lost (channel, range or age).
    fn on_dropped(&mut self, _sender: VehicleId, _reason: DropReason) {}

    /// Lifecycle transition (`start`, `pause`, `stop`).
    fn on_state_changed(&mut self, _state: SimState) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
