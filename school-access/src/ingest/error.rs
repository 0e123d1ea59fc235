//! Ingestion error types.

use std::path::PathBuf;

use crate::domain::DomainError;

/// Errors from reading and validating input datasets.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A required input file does not exist
    #[error("missing input file {}: {hint}", path.display())]
    MissingFile { path: PathBuf, hint: &'static str },

    /// Reading a file failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON dataset could not be parsed
    #[error("JSON parse error in {}: {message}", path.display())]
    Json { path: PathBuf, message: String },

    /// A CSV file could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// None of the accepted column names is present
    #[error("{dataset}: no column named any of {candidates:?}")]
    MissingColumn {
        dataset: &'static str,
        candidates: &'static [&'static str],
    },

    /// A record failed validation
    #[error(transparent)]
    Domain(#[from] DomainError),
}
