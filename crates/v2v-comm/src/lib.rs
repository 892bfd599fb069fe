//! `v2v-comm` — application-level messaging over the interference graph.
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | [`message`] | Envelope + tagged payload (awareness / event / raw)     |
//! | [`manager`] | Delay-line queue, loss and jitter, per-vehicle inboxes  |
//! | [`stats`]   | Rolling communication statistics                        |
//! | [`error`]   | `CommError`: channel configuration outside its domain   |
//!
//! All timestamps are **simulation seconds**.  The manager never reads a
//! wall clock, which is what makes seeded runs replay exactly.

pub mod error;
pub mod manager;
pub mod message;
pub mod stats;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CommError, CommResult};
pub use manager::{CommConfig, CommManager, CommObserver, DropReason, NoopCommObserver};
pub use message::{
    Envelope, EventKind, Message, MessageIds, MessageKind, Payload, Priority,
    DEFAULT_EVENT_TTL_S,
};
pub use stats::CommStats;
