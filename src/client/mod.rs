//! HTTP API Client
//!
//! The single configured entry point for every backend call. Built on a
//! shared `reqwest::Client` with:
//!
//! - a fixed API root every resource path is relative to
//! - `Content-Type: application/json` by default (multipart overrides it)
//! - an outbound hook attaching `Authorization: Bearer <token>` when the
//!   session holds a token
//! - an inbound hook classifying failures; a 401 invalidates the session and
//!   surfaces as [`ClientError::SessionExpired`]
//!
//! The client only sees the session through [`SessionAccessor`].

pub mod error;

pub use error::{ClientError, ClientResult};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::session::SessionAccessor;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Authenticated REST client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionAccessor>,
}

impl ApiClient {
    /// Create a client for the configured API root
    pub fn new(config: &ApiConfig, session: Arc<dyn SessionAccessor>) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("cmms-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::RequestConfig(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The API root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a resource path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path`
    pub async fn get<T>(&self, path: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.execute(self.http.get(self.url(path))).await
    }

    /// GET `path` with query parameters
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.http.get(self.url(path)).query(query)).await
    }

    /// POST a JSON body
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    /// POST a JSON body without the session's bearer token.
    ///
    /// Used for the credential exchange: a 401 here means the credentials
    /// were wrong, so it becomes [`ClientError::InvalidCredentials`] and the
    /// stored session is left alone.
    pub async fn post_anonymous<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.http.post(self.url(path)).json(body), false)
            .await
    }

    /// PATCH a partial JSON body
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.http.patch(self.url(path)).json(body)).await
    }

    /// DELETE a resource
    pub async fn delete<T>(&self, path: &str) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.execute(self.http.delete(self.url(path))).await
    }

    /// POST a multipart form; the form's boundary content type replaces the
    /// JSON default
    pub async fn post_multipart<T>(&self, path: &str, form: Form) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.execute(self.http.post(self.url(path)).multipart(form))
            .await
    }

    /// Run a request through both hooks
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        self.send(request, true).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        authenticated: bool,
    ) -> ClientResult<T> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (request, sent_token) = if authenticated {
            self.authorize(request, &request_id)
        } else {
            (request.header(REQUEST_ID_HEADER, request_id.as_str()), None)
        };

        let request = match request.build() {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Request configuration failed");
                return Err(ClientError::RequestConfig(e.to_string()));
            }
        };

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            url = %url,
            authenticated = sent_token.is_some(),
            "Sending request"
        );

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                tracing::error!(request_id = %request_id, error = %e, "Request configuration failed");
                return Err(ClientError::RequestConfig(e.to_string()));
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    url = %url,
                    error = %e,
                    "Network error or backend unavailable"
                );
                return Err(ClientError::Network(e));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Failed to read response body");
                return Err(ClientError::Network(e));
            }
        };

        if status.is_success() {
            return decode_body(&body);
        }

        if status == StatusCode::UNAUTHORIZED && !authenticated {
            tracing::warn!(request_id = %request_id, "Credentials rejected");
            return Err(ClientError::InvalidCredentials(
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        Err(self.reject(status, &body, sent_token.as_deref(), &request_id))
    }

    /// Outbound hook: correlation id plus bearer token when one is stored.
    /// A missing token never blocks the request.
    fn authorize(
        &self,
        request: RequestBuilder,
        request_id: &str,
    ) -> (RequestBuilder, Option<String>) {
        let request = request.header(REQUEST_ID_HEADER, request_id);
        match self.session.access_token() {
            Some(token) => (request.bearer_auth(&token), Some(token)),
            None => (request, None),
        }
    }

    /// Inbound hook for non-success responses
    fn reject(
        &self,
        status: StatusCode,
        body: &[u8],
        sent_token: Option<&str>,
        request_id: &str,
    ) -> ClientError {
        let status = status.as_u16();
        let body = String::from_utf8_lossy(body).into_owned();

        match status {
            401 => {
                let cleared = self.session.invalidate(sent_token);
                tracing::warn!(request_id = %request_id, cleared, "401 Unauthorized");
                ClientError::SessionExpired
            }
            500..=599 => {
                tracing::error!(
                    request_id = %request_id,
                    status,
                    body = %body,
                    "Internal server error"
                );
                ClientError::Server { status, body }
            }
            _ => {
                tracing::debug!(request_id = %request_id, status, "Request rejected");
                ClientError::Status { status, body }
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Decode a success body; an empty body reads as JSON `null`
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ClientResult<T> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
}
