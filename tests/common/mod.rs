//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use prefix_proxy::config::ProxyConfig;
use prefix_proxy::lifecycle::Shutdown;
use prefix_proxy::observability::TelemetrySink;
use prefix_proxy::HttpServer;

/// Size of the `/v1/large` response body.
pub const LARGE_BODY_LEN: usize = 1024 * 1024;

/// A request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }
}

pub fn large_body() -> Vec<u8> {
    (0..LARGE_BODY_LEN).map(|i| (i % 251) as u8).collect()
}

/// Start an upstream that records every request and answers by path:
/// - `/v1/models`: 200 `{"object":"list"}`
/// - `/v1/rate-limited`: 429 with `Retry-After: 5`
/// - `/v1/cookies`: 200 with two `Set-Cookie` headers
/// - `/v1/large`: 200 with a 1 MiB patterned body
/// - anything else: 200 echoing the request body
pub async fn start_mock_upstream() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .fallback(mock_handler)
        .with_state(captured.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream { addr, captured }
}

async fn mock_handler(
    State(captured): State<Arc<Mutex<Vec<Captured>>>>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let path = parts.uri.path().to_string();

    captured.lock().unwrap().push(Captured {
        method: parts.method,
        path: path.clone(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body: body.clone(),
    });

    match path.as_str() {
        "/v1/models" => (
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"object":"list"}"#,
        )
            .into_response(),
        "/v1/rate-limited" => (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "5")],
            "rate limited",
        )
            .into_response(),
        "/v1/cookies" => (
            AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
            "cookies",
        )
            .into_response(),
        "/v1/large" => large_body().into_response(),
        _ => body.into_response(),
    }
}

/// A local address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the proxy on an ephemeral port, forwarding to `origin`.
pub async fn start_proxy(mut config: ProxyConfig, origin: String, telemetry: Arc<dyn TelemetrySink>) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();
    config.upstream.origin = origin;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, telemetry, shutdown.clone()).unwrap();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, server_shutdown));

    RunningProxy { addr, shutdown, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
