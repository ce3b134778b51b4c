//! Development Proxy
//!
//! Serves the same origin as the UI during development and forwards every
//! `/api/*` request to the backend.
//!
//! # Endpoints
//!
//! - `ANY /api/*` - Forwarded upstream with method, path, query, body and
//!   end-to-end headers intact; `Host` is rewritten to the target
//! - `GET /health` - Proxy status
//!
//! An unreachable upstream answers `502 Bad Gateway`.

pub mod error;

pub use error::{ProxyError, ProxyResult};

use axum::{
    body::{to_bytes, Body},
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ProxyConfig;

/// Largest request body forwarded (map uploads)
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Headers that describe a single connection and are never forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Shared proxy state
pub struct ProxyState {
    upstream: reqwest::Client,
    target: String,
    started: Instant,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig) -> ProxyResult<Self> {
        let upstream = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;

        Ok(Self {
            upstream,
            target: config.target.trim_end_matches('/').to_string(),
            started: Instant::now(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Build the proxy router
pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api", any(forward))
        .route("/api/*rest", any(forward))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Start the proxy
pub async fn serve(config: &ProxyConfig) -> ProxyResult<()> {
    let router = build_router(ProxyState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .map_err(|error| ProxyError::Bind {
            addr: config.listen.clone(),
            error,
        })?;

    tracing::info!(listen = %config.listen, target = %config.target, "CMMS proxy listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ProxyError::Serve(e.to_string()))?;

    tracing::info!("CMMS proxy shut down gracefully");
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    target: String,
    uptime_seconds: u64,
    version: &'static str,
}

/// GET /health
async fn health(State(state): State<Arc<ProxyState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        target: state.target.clone(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// ANY /api/*
async fn forward(State(state): State<Arc<ProxyState>>, request: Request) -> ProxyResult<Response> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.target, path_and_query);

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::Body(e.to_string()))?;

    let mut upstream = state.upstream.request(method, &url);
    for (name, value) in parts.headers.iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        upstream = upstream.header(name.as_str(), value.as_bytes());
    }
    if let Some(host) = parts.headers.get("host") {
        upstream = upstream.header("x-forwarded-host", host.as_bytes());
    }

    tracing::debug!(method = %parts.method, url = %url, "Forwarding");

    let response = upstream.body(body).send().await.map_err(|e| {
        if e.is_timeout() {
            ProxyError::Timeout(e.to_string())
        } else if e.is_builder() {
            ProxyError::InvalidRequest(e.to_string())
        } else {
            ProxyError::Upstream(e.to_string())
        }
    })?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;
    let headers = copy_headers(response.headers());
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let mut reply = Response::new(Body::from(bytes));
    *reply.status_mut() = status;
    *reply.headers_mut() = headers;
    Ok(reply)
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Copy end-to-end response headers across the two `http` versions
fn copy_headers(upstream: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) else {
            continue;
        };
        headers.append(name, value);
    }
    headers
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use tower::util::ServiceExt;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(target: &str) -> Router {
        let config = ProxyConfig {
            target: target.to_string(),
            timeout_secs: 5,
            ..Default::default()
        };
        build_router(ProxyState::new(&config).unwrap())
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app("http://localhost:8000")
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["target"], "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_forwards_method_path_query_and_headers() {
        let backend = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/tickets/t-1/"))
            .and(query_param("expand", "asset"))
            .and(header("authorization", "Bearer tok"))
            .and(body_string(r#"{"status":"closed"}"#))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-backend", "django")
                    .set_body_string(r#"{"id":"t-1"}"#),
            )
            .expect(1)
            .mount(&backend)
            .await;

        let response = app(&backend.uri())
            .oneshot(
                HttpRequest::builder()
                    .method("PATCH")
                    .uri("/api/tickets/t-1/?expand=asset")
                    .header("authorization", "Bearer tok")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"closed"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-backend"], "django");
        assert_eq!(body_text(response).await, r#"{"id":"t-1"}"#);
    }

    #[tokio::test]
    async fn test_upstream_status_passes_through() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/me/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&backend)
            .await;

        let response = app(&backend.uri())
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/users/me/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upstream_down_is_bad_gateway() {
        // Nothing listens on the discard port
        let response = app("http://127.0.0.1:9")
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/tickets/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_non_api_paths_are_not_forwarded() {
        let response = app("http://127.0.0.1:9")
            .oneshot(
                HttpRequest::builder()
                    .uri("/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_hop_by_hop() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("host"));
        assert!(!is_hop_by_hop("authorization"));
    }
}
