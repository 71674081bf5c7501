//! Metadata client errors

use thiserror::Error;

/// Errors that can occur when fetching catalog metadata.
#[derive(Debug, Error)]
pub enum MetaError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog service returned an unexpected response
    #[error("catalog error: {0}")]
    Api(String),
}
