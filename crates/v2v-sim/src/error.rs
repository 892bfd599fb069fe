use thiserror::Error;

use crate::engine::SimState;

/// Engine-level errors.  Only lifecycle misuse surfaces here — planner,
/// comms and interference failures are recovered locally and reflected in
/// statistics.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SimState,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
