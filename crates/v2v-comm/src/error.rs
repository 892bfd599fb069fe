//! Communication-subsystem error type.
//!
//! Per-copy failures (channel loss, range, aging) are not errors here —
//! they are normal outcomes of the channel model, reported as
//! [`DropReason`](crate::DropReason) and counted in statistics.
//! `CommError` covers the one genuine caller mistake: a channel
//! configuration outside its domain.

use thiserror::Error;

/// Errors produced by `v2v-comm`.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("packet loss rate {0} outside [0, 1]")]
    LossRateOutOfRange(f64),

    #[error("base latency {0} ms is negative")]
    NegativeLatency(f64),

    #[error("jitter sigma {0} ms is negative")]
    NegativeJitter(f64),

    #[error("max message age {0} s is not positive")]
    NonPositiveMaxAge(f64),
}

pub type CommResult<T> = Result<T, CommError>;
