//! Proxy Error Types
//!
//! Errors from binding, serving and forwarding, with their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    /// The listen address could not be bound
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: std::io::Error },

    #[error("Server error: {0}")]
    Serve(String),

    /// The upstream backend could not be reached
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// The upstream did not answer in time
    #[error("Upstream timed out: {0}")]
    Timeout(String),

    /// The incoming request could not be forwarded as is
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request body too large or unreadable: {0}")]
    Body(String),

    /// Building the upstream HTTP client failed
    #[error("Client setup failed: {0}")]
    Client(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
            ProxyError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "GATEWAY_TIMEOUT"),
            ProxyError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ProxyError::Body(_) => (StatusCode::PAYLOAD_TOO_LARGE, "BODY_REJECTED"),
            ProxyError::Bind { .. } | ProxyError::Serve(_) | ProxyError::Client(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        tracing::error!(error_code = %code, error_message = %self, "Proxy error");

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = ProxyError::Upstream("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = ProxyError::Timeout("30s".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let response = ProxyError::InvalidRequest("bad header".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
