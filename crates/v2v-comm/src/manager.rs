//! Communication manager: delay line, loss, inboxes, statistics.
//!
//! # Delay line
//!
//! Pending deliveries sit in a binary heap keyed on `(deliver_at, seq)`.
//! The sequence number makes the order total and send-stable: two copies
//! scheduled for the same instant pop in send order.  A pending message is
//! delivered once simulation time passes `deliver_at` (strictly — at
//! exactly `deliver_at` it is still in flight).
//!
//! # Aging
//!
//! A message older than `max_age_s` at pop time is dropped with reason
//! `TooOld`; messages that age out *inside* an inbox after delivery are
//! garbage-collected silently.  Expired messages are not filtered at
//! enqueue time — they ride the queue until their pop.
//!
//! # Determinism
//!
//! Loss trials and latency jitter draw from the caller's [`SimRng`], so a
//! seeded engine replays the exact same delivery pattern.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use rand_distr::{Distribution, Normal};

use v2v_core::{SimRng, VehicleId};
use v2v_net::InterferenceGraph;

use crate::error::{CommError, CommResult};
use crate::message::{Message, MessageKind};
use crate::stats::CommStats;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Channel model parameters.
#[derive(Clone, Debug)]
pub struct CommConfig {
    /// Probability that any single copy is lost, `[0, 1]`.
    pub packet_loss_rate: f64,
    /// Mean one-way latency, milliseconds.
    pub base_latency_ms: f64,
    /// Standard deviation of the Gaussian latency jitter, milliseconds.
    pub jitter_sigma_ms: f64,
    /// Messages older than this are dropped or collected, seconds.
    pub max_age_s: f64,
}

impl CommConfig {
    /// Check every parameter against its domain.
    ///
    /// Callers that assemble a config from untrusted input (the engine, the
    /// JSON adapter) validate before use and fall back to defaults on error.
    pub fn validate(&self) -> CommResult<()> {
        if !(0.0..=1.0).contains(&self.packet_loss_rate) {
            return Err(CommError::LossRateOutOfRange(self.packet_loss_rate));
        }
        if self.base_latency_ms < 0.0 {
            return Err(CommError::NegativeLatency(self.base_latency_ms));
        }
        if self.jitter_sigma_ms < 0.0 {
            return Err(CommError::NegativeJitter(self.jitter_sigma_ms));
        }
        if self.max_age_s <= 0.0 {
            return Err(CommError::NonPositiveMaxAge(self.max_age_s));
        }
        Ok(())
    }
}

impl Default for CommConfig {
    /// Defaults match a realistic DSRC urban channel.
    fn default() -> Self {
        Self {
            packet_loss_rate: 0.05,
            base_latency_ms: 10.0,
            jitter_sigma_ms: 2.0,
            max_age_s: 5.0,
        }
    }
}

// ── Observer hooks ────────────────────────────────────────────────────────────

/// Why a copy never reached (or left) an inbox.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DropReason {
    /// Lost to the channel at send time.
    Loss,
    /// Unicast target not in the sender's neighbor set.
    OutOfRange,
    /// Exceeded `max_age_s` before delivery.
    TooOld,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Loss => "Loss",
            DropReason::OutOfRange => "OutOfRange",
            DropReason::TooOld => "TooOld",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery/drop notifications, invoked synchronously on the engine thread.
/// Handlers must not block.
pub trait CommObserver {
    fn on_transmitted(&mut self, _sender: VehicleId, _receiver: VehicleId, _kind: MessageKind) {}
    fn on_dropped(&mut self, _sender: VehicleId, _reason: DropReason) {}
}

/// A [`CommObserver`] that does nothing.
pub struct NoopCommObserver;

impl CommObserver for NoopCommObserver {}

// ── Pending delivery ──────────────────────────────────────────────────────────

struct Pending {
    deliver_at: f64,
    /// Tie-break: preserves send order for equal delivery times.
    seq: u64,
    target: VehicleId,
    message: Message,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deliver_at
            .total_cmp(&other.deliver_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

// ── CommManager ───────────────────────────────────────────────────────────────

/// One-hop broadcast/unicast transport over the interference graph.
///
/// The manager owns the inboxes, the delay line and the statistics; the
/// interference graph is borrowed per call because the engine owns it and
/// rebuilds it on its own cadence.
pub struct CommManager {
    pub config: CommConfig,

    inboxes: HashMap<VehicleId, Vec<Message>>,
    /// Min-heap on `(deliver_at, seq)`.
    pending: BinaryHeap<Reverse<Pending>>,
    next_seq: u64,

    /// Accumulated from the `dt`s passed to `update`.
    sim_time: f64,

    stats: CommStats,
    // Throughput window state.
    window_start: f64,
    window_sent: u64,
}

impl CommManager {
    pub fn new(config: CommConfig) -> Self {
        Self {
            config,
            inboxes: HashMap::new(),
            pending: BinaryHeap::new(),
            next_seq: 0,
            sim_time: 0.0,
            stats: CommStats::new(),
            window_start: 0.0,
            window_sent: 0,
        }
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn stats(&self) -> &CommStats {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
        self.window_start = self.sim_time;
        self.window_sent = 0;
    }

    /// In-flight copies (scheduled, not yet popped).
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Undrained messages waiting for `vehicle`.
    pub fn inbox_len(&self, vehicle: VehicleId) -> usize {
        self.inboxes.get(&vehicle).map_or(0, Vec::len)
    }

    /// Rewind the manager's clock to 0 without discarding the queue or the
    /// inboxes (engine stop).  Pending deliveries keep their absolute
    /// schedule and pop once the new timeline reaches them.
    pub fn rewind_clock(&mut self) {
        self.sim_time = 0.0;
        self.window_start = 0.0;
        self.window_sent = self.stats.sent;
    }

    /// Discard all in-flight copies and inbox contents and rewind the
    /// manager's clock (engine reset).
    pub fn clear(&mut self) {
        self.inboxes.clear();
        self.pending.clear();
        self.sim_time = 0.0;
        self.window_start = 0.0;
        self.window_sent = 0;
    }

    // ── Send operations ───────────────────────────────────────────────────

    /// Broadcast `message` to every current neighbor of its sender.
    ///
    /// Each copy rolls an independent loss trial; survivors are scheduled on
    /// the delay line.  Returns the number of copies scheduled (not yet
    /// received).  `max_hops` is accepted for the reserved multi-hop
    /// extension; only direct delivery is implemented.
    pub fn broadcast<O: CommObserver>(
        &mut self,
        graph: &InterferenceGraph,
        message: Message,
        _max_hops: u32,
        rng: &mut SimRng,
        observer: &mut O,
    ) -> usize {
        let sender = message.sender();
        let mut scheduled = 0;

        for neighbor in graph.neighbors(sender) {
            if self.loss_trial(rng) {
                self.stats.dropped += 1;
                observer.on_dropped(sender, DropReason::Loss);
                continue;
            }
            let latency_ms = self.sample_latency(rng);
            self.schedule(message.clone(), neighbor, latency_ms);
            scheduled += 1;
        }

        self.stats.record_sent(message.kind());
        scheduled
    }

    /// Send `message` to a single target, which must currently be a neighbor
    /// of the sender.  Returns `true` when a copy was scheduled.
    pub fn unicast<O: CommObserver>(
        &mut self,
        graph: &InterferenceGraph,
        message: Message,
        target: VehicleId,
        rng: &mut SimRng,
        observer: &mut O,
    ) -> bool {
        let sender = message.sender();

        if !graph.linked(sender, target) {
            self.stats.dropped += 1;
            observer.on_dropped(sender, DropReason::OutOfRange);
            return false;
        }
        if self.loss_trial(rng) {
            self.stats.dropped += 1;
            observer.on_dropped(sender, DropReason::Loss);
            return false;
        }

        let kind = message.kind();
        let latency_ms = self.sample_latency(rng);
        self.schedule(message, target, latency_ms);
        self.stats.record_sent(kind);
        true
    }

    /// Take every delivered-but-unread message for `vehicle`.  Destructive.
    pub fn drain_inbox(&mut self, vehicle: VehicleId) -> Vec<Message> {
        self.inboxes.remove(&vehicle).unwrap_or_default()
    }

    // ── Per-tick update ───────────────────────────────────────────────────

    /// Advance simulation time by `dt`, flush due deliveries, age inboxes
    /// and refresh the rolling statistics.
    pub fn update<O: CommObserver>(
        &mut self,
        dt: f64,
        graph: &InterferenceGraph,
        observer: &mut O,
    ) {
        self.sim_time += dt;
        let max_age_ms = self.config.max_age_s * 1_000.0;

        // Deliver every head strictly past its delivery time.
        loop {
            match self.pending.peek() {
                Some(Reverse(head)) if head.deliver_at < self.sim_time => {}
                _ => break,
            }
            let Some(Reverse(p)) = self.pending.pop() else { break };

            if p.message.age_ms(self.sim_time) > max_age_ms {
                self.stats.dropped += 1;
                observer.on_dropped(p.message.sender(), DropReason::TooOld);
            } else {
                observer.on_transmitted(p.message.sender(), p.target, p.message.kind());
                self.stats.received += 1;
                self.inboxes.entry(p.target).or_default().push(p.message);
            }
        }

        // Collect messages that aged out inside an inbox.
        let now = self.sim_time;
        for inbox in self.inboxes.values_mut() {
            inbox.retain(|m| m.age_ms(now) <= max_age_ms);
        }

        // Refresh throughput over 1 s windows and mirror link statistics.
        if self.sim_time - self.window_start >= 1.0 {
            self.stats.throughput_msgs_per_s =
                (self.stats.sent - self.window_sent) as f64 / (self.sim_time - self.window_start);
            self.window_start = self.sim_time;
            self.window_sent = self.stats.sent;
        }
        self.stats.active_links = graph.link_count();
        self.stats.avg_neighbors = graph.average_degree();
    }

    // ── Channel model ─────────────────────────────────────────────────────

    /// `true` when this copy is lost: uniform `[0, 1) < packet_loss_rate`.
    fn loss_trial(&self, rng: &mut SimRng) -> bool {
        rng.random::<f64>() < self.config.packet_loss_rate
    }

    /// One-way latency sample: `max(1 ms, base + N(0, jitter_sigma))`.
    fn sample_latency(&self, rng: &mut SimRng) -> f64 {
        let jitter = if self.config.jitter_sigma_ms > 0.0 {
            Normal::new(0.0, self.config.jitter_sigma_ms)
                .map(|dist| dist.sample(rng.inner()))
                .unwrap_or(0.0)
        } else {
            0.0
        };
        (self.config.base_latency_ms + jitter).max(1.0)
    }

    fn schedule(&mut self, message: Message, target: VehicleId, latency_ms: f64) {
        self.stats.record_latency(latency_ms);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Reverse(Pending {
            deliver_at: self.sim_time + latency_ms / 1_000.0,
            seq,
            target,
            message,
        }));
    }
}
