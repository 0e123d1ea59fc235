//! Domain error types.
//!
//! These errors represent validation failures in input records. They are
//! distinct from the query errors raised by the graph and optimizer.

use super::{InvalidCoord, InvalidId, StopId, ZoneCode};

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Latitude/longitude out of range or non-finite
    #[error(transparent)]
    InvalidCoord(#[from] InvalidCoord),

    /// Blank identifier
    #[error(transparent)]
    InvalidId(#[from] InvalidId),

    /// Two zone records share a code
    #[error("duplicate zone code: {0}")]
    DuplicateZone(ZoneCode),

    /// Two stop records share an id
    #[error("duplicate stop id: {0}")]
    DuplicateStop(StopId),
}
