//! V2V message model.
//!
//! One value type carries the common envelope plus a discriminated payload;
//! behavior that the original spread over a virtual-dispatch hierarchy is
//! limited here to the envelope getters and `Display` serialization.
//!
//! Messages are immutable after construction except for the hop counter,
//! which is reserved for the multi-hop extension.

use std::fmt;

use v2v_core::{GeoPoint, MessageId, VehicleId};

/// Validity window applied to events constructed without an explicit expiry.
pub const DEFAULT_EVENT_TTL_S: f64 = 60.0;

// ── Enums ─────────────────────────────────────────────────────────────────────

/// Transmission priority.  Awareness traffic is `Normal`, events are `High`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

/// Road event categories carried by event messages.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EventKind {
    HardBraking,
    Accident,
    Obstacle,
    Slippery,
    Jam,
    EmergencyVehicle,
    Other,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::HardBraking => "HardBraking",
            EventKind::Accident => "Accident",
            EventKind::Obstacle => "Obstacle",
            EventKind::Slippery => "Slippery",
            EventKind::Jam => "Jam",
            EventKind::EmergencyVehicle => "EmergencyVehicle",
            EventKind::Other => "Other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of the payload, used for statistics and observer hooks.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum MessageKind {
    Awareness,
    Event,
    Raw,
}

impl MessageKind {
    /// Wire-format tag, matching the `Display` serialization prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Awareness => "CAM",
            MessageKind::Event => "DENM",
            MessageKind::Raw => "CUSTOM",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── MessageIds ────────────────────────────────────────────────────────────────

/// Monotonic message-id allocator.
///
/// Owned by the engine and passed to message constructors; ids are unique
/// and strictly increasing within one allocator.  (The original used a
/// process-wide static counter; a context object keeps the core free of
/// globals.)
#[derive(Default)]
pub struct MessageIds(u64);

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> MessageId {
        let id = MessageId(self.0);
        self.0 += 1;
        id
    }
}

// ── Envelope & payload ────────────────────────────────────────────────────────

/// Fields common to every message.  Immutable after construction except
/// `hop_count`.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub message_id: MessageId,
    pub sender: VehicleId,
    /// Simulation time of construction, seconds.
    pub created_at: f64,
    pub hop_count: u32,
    pub priority: Priority,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Periodic position/state broadcast (CAM).
    Awareness {
        position: GeoPoint,
        speed_mps: f64,
        heading_rad: f64,
        accel_mps2: f64,
    },
    /// High-priority road event notification (DENM) with an expiry.
    Event {
        kind: EventKind,
        location: GeoPoint,
        text: String,
        /// Simulation time after which the event is stale, seconds.
        valid_until: f64,
    },
    /// Free-form application payload.
    Raw { payload: Vec<u8> },
}

// ── Message ───────────────────────────────────────────────────────────────────

/// A V2V message: envelope plus tagged payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub envelope: Envelope,
    pub payload: Payload,
}

impl Message {
    /// Construct an awareness (CAM) message at `Normal` priority.
    pub fn awareness(
        ids: &mut MessageIds,
        sender: VehicleId,
        now: f64,
        position: GeoPoint,
        speed_mps: f64,
        heading_rad: f64,
        accel_mps2: f64,
    ) -> Self {
        Self {
            envelope: Envelope {
                message_id: ids.next(),
                sender,
                created_at: now,
                hop_count: 0,
                priority: Priority::Normal,
            },
            payload: Payload::Awareness { position, speed_mps, heading_rad, accel_mps2 },
        }
    }

    /// Construct an event (DENM) message at `High` priority, valid for
    /// `valid_for_s` seconds from `now`.
    pub fn event(
        ids: &mut MessageIds,
        sender: VehicleId,
        now: f64,
        kind: EventKind,
        location: GeoPoint,
        text: impl Into<String>,
        valid_for_s: f64,
    ) -> Self {
        Self {
            envelope: Envelope {
                message_id: ids.next(),
                sender,
                created_at: now,
                hop_count: 0,
                priority: Priority::High,
            },
            payload: Payload::Event {
                kind,
                location,
                text: text.into(),
                valid_until: now + valid_for_s,
            },
        }
    }

    /// Construct a raw (CUSTOM) message at the given priority.
    pub fn raw(
        ids: &mut MessageIds,
        sender: VehicleId,
        now: f64,
        payload: Vec<u8>,
        priority: Priority,
    ) -> Self {
        Self {
            envelope: Envelope {
                message_id: ids.next(),
                sender,
                created_at: now,
                hop_count: 0,
                priority,
            },
            payload: Payload::Raw { payload },
        }
    }

    // ── Envelope getters ──────────────────────────────────────────────────

    #[inline]
    pub fn id(&self) -> MessageId {
        self.envelope.message_id
    }

    #[inline]
    pub fn sender(&self) -> VehicleId {
        self.envelope.sender
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.envelope.priority
    }

    #[inline]
    pub fn created_at(&self) -> f64 {
        self.envelope.created_at
    }

    #[inline]
    pub fn hop_count(&self) -> u32 {
        self.envelope.hop_count
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        match self.payload {
            Payload::Awareness { .. } => MessageKind::Awareness,
            Payload::Event { .. } => MessageKind::Event,
            Payload::Raw { .. } => MessageKind::Raw,
        }
    }

    /// Age of the message at simulation time `now`, in milliseconds.
    #[inline]
    pub fn age_ms(&self, now: f64) -> f64 {
        (now - self.envelope.created_at) * 1_000.0
    }

    /// Events are valid from creation until their expiry; other kinds never
    /// expire on their own (the manager's max-age still applies).
    pub fn is_valid(&self, now: f64) -> bool {
        match &self.payload {
            Payload::Event { valid_until, .. } => {
                self.envelope.created_at <= now && now <= *valid_until
            }
            _ => true,
        }
    }

    /// Bump the hop counter (reserved for multi-hop forwarding).
    pub fn increment_hop(&mut self) {
        self.envelope.hop_count += 1;
    }
}

impl fmt::Display for Message {
    /// Stable human-readable serialization.  Positions print as `(x, y)` =
    /// `(lon, lat)` with 6 decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sender = self.envelope.sender.0;
        match &self.payload {
            Payload::Awareness { position, speed_mps, heading_rad, .. } => write!(
                f,
                "CAM[{sender}]: pos({:.6},{:.6}) speed={speed_mps:.2} heading={heading_rad:.2}",
                position.lon, position.lat
            ),
            Payload::Event { kind, location, text, .. } => write!(
                f,
                "DENM[{sender}]: event={kind} at({:.6},{:.6}) - {text}",
                location.lon, location.lat
            ),
            Payload::Raw { payload } => {
                write!(f, "CUSTOM[{sender}]: {}", String::from_utf8_lossy(payload))
            }
        }
    }
}
