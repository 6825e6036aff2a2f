//! Scaleway client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Scaleway API
#[derive(Debug, Error)]
pub enum ScalewayError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Scaleway API returned an error
    #[error("Scaleway API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid or revoked secret key)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ScalewayError {
    /// True when the API answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScalewayError::NotFound(_))
    }
}
