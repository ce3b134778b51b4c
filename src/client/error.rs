//! Client Error Types
//!
//! One variant per failure class: local validation, authentication failure,
//! rejected credentials, server fault, other HTTP status, network failure, request configuration
//! and undecodable responses.

use thiserror::Error;

use crate::session::SessionError;

/// Errors returned by the HTTP client and every resource service
#[derive(Error, Debug)]
pub enum ClientError {
    /// Required input missing; no request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend rejected the credentials; the session has been cleared
    #[error("Session expired or invalid")]
    SessionExpired,

    /// The credential exchange was refused (401 on login)
    #[error("Invalid email or password")]
    InvalidCredentials(String),

    /// 5xx response
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Any other non-success response (400, 403, 404, ...)
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No response received (backend down, timeout, connection refused)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request could not be built
    #[error("Request configuration error: {0}")]
    RequestConfig(String),

    /// Success response whose body does not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Persisting session data failed
    #[error("Session store error: {0}")]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Whether this is the distinguished authentication failure
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
    }

    /// HTTP status, when the backend answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::SessionExpired | ClientError::InvalidCredentials(_) => Some(401),
            ClientError::Server { status, .. } | ClientError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
