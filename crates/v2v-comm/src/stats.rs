//! Rolling communication statistics.
//!
//! Owned by the [`CommManager`](crate::CommManager) instance — two engines
//! in one process never share counters.

use crate::message::MessageKind;

/// Counters and aggregates updated at tick granularity.
#[derive(Clone, Debug)]
pub struct CommStats {
    /// Send operations (one per broadcast/unicast call, not per copy).
    pub sent: u64,
    /// Messages deposited into inboxes.
    pub received: u64,
    /// Copies lost to the channel, range checks or aging.
    pub dropped: u64,

    // Per-kind send counters.
    pub awareness_sent: u64,
    pub event_sent: u64,
    pub raw_sent: u64,

    // Latency of scheduled deliveries, milliseconds.
    pub latency_avg_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    latency_samples: u64,

    // Mirrored from the interference graph each update.
    pub active_links: usize,
    pub avg_neighbors: f64,

    /// Send rate over the last 1 s window, messages per second.
    pub throughput_msgs_per_s: f64,
}

impl CommStats {
    pub fn new() -> Self {
        Self {
            sent: 0,
            received: 0,
            dropped: 0,
            awareness_sent: 0,
            event_sent: 0,
            raw_sent: 0,
            latency_avg_ms: 0.0,
            latency_min_ms: f64::INFINITY,
            latency_max_ms: 0.0,
            latency_samples: 0,
            active_links: 0,
            avg_neighbors: 0.0,
            throughput_msgs_per_s: 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Sends of the given kind so far.
    pub fn sent_by_kind(&self, kind: MessageKind) -> u64 {
        match kind {
            MessageKind::Awareness => self.awareness_sent,
            MessageKind::Event => self.event_sent,
            MessageKind::Raw => self.raw_sent,
        }
    }

    pub(crate) fn record_sent(&mut self, kind: MessageKind) {
        self.sent += 1;
        match kind {
            MessageKind::Awareness => self.awareness_sent += 1,
            MessageKind::Event => self.event_sent += 1,
            MessageKind::Raw => self.raw_sent += 1,
        }
    }

    pub(crate) fn record_latency(&mut self, latency_ms: f64) {
        let n = self.latency_samples as f64;
        self.latency_avg_ms = (self.latency_avg_ms * n + latency_ms) / (n + 1.0);
        self.latency_samples += 1;
        self.latency_min_ms = self.latency_min_ms.min(latency_ms);
        self.latency_max_ms = self.latency_max_ms.max(latency_ms);
    }
}

impl Default for CommStats {
    fn default() -> Self {
        Self::new()
    }
}
