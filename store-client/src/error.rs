//! Client error types

use thiserror::Error;

/// Gateway client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport failure before a response arrived
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway-reported failure, surfaced verbatim (status + body)
    #[error("Error {status}: {body}")]
    Api { status: u16, body: String },

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status behind this error, when the gateway answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Validation(_) => Some(400),
            _ => None,
        }
    }

    /// True for 401/403 responses
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
