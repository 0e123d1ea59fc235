//! Open-data portal error types.

/// Errors that can occur when downloading from the portal.
#[derive(Debug, thiserror::Error)]
pub enum SocrataError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal rejected the app token
    #[error("unauthorized: check SOCRATA_APP_TOKEN")]
    Unauthorized,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body was not a JSON array of rows
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Writing a download to disk failed
    #[error("failed to save {dataset}: {message}")]
    Save { dataset: String, message: String },
}
