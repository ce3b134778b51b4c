//! Session store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the session store
#[derive(Error, Debug)]
pub enum SessionError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Session file exists but is not a JSON object of strings
    #[error("Corrupt session file {path:?}: {error}")]
    Corrupt { path: PathBuf, error: String },

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::Lock("poisoned".to_string());
        assert_eq!(err.to_string(), "Lock error: poisoned");

        let err = SessionError::Corrupt {
            path: PathBuf::from("session.json"),
            error: "expected object".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt session file \"session.json\": expected object"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: SessionError = json_err.into();
        assert!(matches!(err, SessionError::Serialization(_)));
    }
}
