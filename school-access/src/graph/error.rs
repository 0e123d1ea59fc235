//! Access graph error types.

use crate::domain::{DomainError, StopId, ZoneCode};
use crate::geo_index::IndexError;

/// Errors from building or querying the access graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// No stops to index; the run cannot proceed
    #[error("no stops supplied: cannot build the access graph")]
    EmptyInput,

    /// A query referenced a zone that was never loaded
    #[error("unknown zone: {0}")]
    UnknownZone(ZoneCode),

    /// A query referenced a stop that was never loaded
    #[error("unknown stop: {0}")]
    UnknownStop(StopId),

    /// Walk radius or speed is unusable
    #[error("invalid walk parameter: {0}")]
    InvalidParameter(String),

    /// Input records are inconsistent
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<IndexError> for GraphError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::EmptyInput => GraphError::EmptyInput,
        }
    }
}
