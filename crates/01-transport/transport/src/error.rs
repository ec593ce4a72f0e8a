//! Error handling helpers for the transport crate.
//!
//! The transport layer keeps its error surface small: capacity validation at
//! construction time. Steady-state operations (ring put/get, pool growth,
//! buffer swaps) never fail and report back-pressure through return values.

use std::fmt;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors surfaced by low-level transport helpers.
pub enum TransportError {
    /// Requested capacity is below the minimum the structure can operate with.
    InvalidCapacity { requested: usize, minimum: usize },
    /// A semaphore was configured with an initial count above its maximum.
    InvalidSemaphoreCount { initial: u32, max: u32 },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidCapacity { requested, minimum } => {
                write!(f, "capacity {requested} must be at least {minimum}")
            }
            TransportError::InvalidSemaphoreCount { initial, max } => {
                write!(
                    f,
                    "semaphore initial count {initial} exceeds maximum count {max}"
                )
            }
        }
    }
}

impl std::error::Error for TransportError {}
