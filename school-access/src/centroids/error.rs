//! Centroid download error types.

use std::path::PathBuf;

/// Errors that can occur when downloading zone centroids.
#[derive(Debug, thiserror::Error)]
pub enum CentroidError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned an error status or an error document
    #[error("API error {status}: {message}")]
    Api { status: i64, message: String },

    /// Response body was not JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Every page came back empty
    #[error("no centroid features returned")]
    NoFeatures,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the CSV to disk failed
    #[error("failed to save {path}: {message}")]
    Save { path: PathBuf, message: String },
}
