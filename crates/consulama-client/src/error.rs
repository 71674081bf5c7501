//! Custom-action client errors

use thiserror::Error;

/// Errors that can occur when invoking custom resource provider actions.
#[derive(Debug, Error)]
pub enum CustomActionError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error response
    #[error("custom action API error: {0}")]
    Api(String),

    /// Resource not found (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// An asynchronous operation reached DONE carrying an error
    #[error("async operation failed; code: {code}")]
    OperationFailed {
        /// Error code reported on the completed operation.
        code: i32,
    },
}

impl CustomActionError {
    /// True if the error denotes remote absence of the resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CustomActionError::NotFound(_))
    }
}
