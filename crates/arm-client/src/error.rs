//! Resource Manager client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Resource Manager API.
#[derive(Debug, Error)]
pub enum ArmError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error response
    #[error("Resource Manager API error: {0}")]
    Api(String),

    /// Resource not found (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Provisioning reached a terminal failure state
    #[error("provisioning failed: {0}")]
    Provisioning(String),
}

impl ArmError {
    /// True if the error denotes remote absence of the resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound(_))
    }
}
