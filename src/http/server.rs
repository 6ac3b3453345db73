//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router with the proxied prefix and the metrics route
//! - Wire up middleware (tracing)
//! - Bind server to listener
//! - Translate, dispatch, record telemetry and relay each request
//!
//! # Request States
//! ```text
//! received → translated → dispatched → awaiting-upstream → relaying → done
//!                              └──────────────┴──→ failed (mapped by ProxyError)
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::error::ProxyError;
use crate::http::request::{BodyPolicy, UpstreamDispatcher};
use crate::http::response::relay;
use crate::lifecycle::Shutdown;
use crate::observability::TelemetrySink;
use crate::routing::{policy, PathPolicy, PathTranslator};

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<PathTranslator>,
    pub path_policy: Arc<dyn PathPolicy>,
    pub dispatcher: Arc<UpstreamDispatcher>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub fail_fast: bool,
    pub shutdown: Shutdown,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// `telemetry` must already have its series registered; `shutdown` is
    /// triggered when `upstream.fail_fast` is set and a dispatch fails.
    ///
    /// Fails only when the TLS client configuration cannot be built.
    pub fn new(
        config: ProxyConfig,
        telemetry: Arc<dyn TelemetrySink>,
        shutdown: Shutdown,
    ) -> Result<Self, rustls::Error> {
        let state = AppState {
            translator: Arc::new(PathTranslator::new(config.upstream.route_prefix.clone())),
            path_policy: Arc::from(policy::from_kind(config.upstream.path_policy)),
            dispatcher: Arc::new(UpstreamDispatcher::new(
                &config.upstream.origin,
                BodyPolicy::from_names(&config.upstream.body_methods),
            )?),
            telemetry,
            fail_fast: config.upstream.fail_fast,
            shutdown,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let prefix = &config.upstream.route_prefix;
        // `get` would also answer HEAD; only GET and POST are proxied.
        let proxied = || get(proxy_handler).post(proxy_handler).head(method_not_allowed);
        Router::new()
            .route(prefix, any(redirect_to_prefix_root))
            .route(&format!("{prefix}/"), proxied())
            .route(&format!("{prefix}/{{*rest}}"), proxied())
            .route(&config.observability.metrics_path, get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving it inside another app or driving it in tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.upstream.route_prefix,
            origin = %self.config.upstream.origin,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Strips the prefix, forwards upstream, records telemetry and relays.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let upstream_path = match translate(&state, &path) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Path translation failed");
            return e.into_response();
        }
    };

    tracing::debug!(
        method = %parts.method,
        path = %path,
        upstream_path = %upstream_path,
        "Proxying request"
    );

    let result = state
        .dispatcher
        .dispatch(parts.method, upstream_path, parts.uri.query(), parts.headers, body)
        .await;

    let elapsed = start.elapsed();
    state.telemetry.observe(&path, elapsed);
    state.telemetry.increment(&path);

    match result {
        Ok(upstream) => {
            tracing::info!(
                path = %path,
                status = upstream.status().as_u16(),
                latency_ms = elapsed.as_millis() as u64,
                "Upstream responded"
            );
            relay(upstream, &path)
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Upstream error");
            if state.fail_fast && e.is_dispatch_failure() {
                tracing::error!("fail_fast is set, shutting down");
                state.shutdown.trigger_failure();
            }
            e.into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET,POST")]).into_response()
}

/// `{prefix}` without the trailing slash: permanent redirect to `{prefix}/`.
async fn redirect_to_prefix_root(State(state): State<AppState>, uri: Uri) -> Response {
    let mut location = format!("{}/", state.translator.prefix());
    if let Some(query) = uri.query() {
        location.push('?');
        location.push_str(query);
    }
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

fn translate<'a>(state: &AppState, path: &'a str) -> Result<&'a str, ProxyError> {
    let upstream_path = state.translator.translate(path)?;
    state.path_policy.check(upstream_path)?;
    Ok(upstream_path)
}

/// Serves the telemetry sink's text exposition.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.telemetry.render() {
        Some(text) => ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], text).into_response(),
        None => (StatusCode::NOT_FOUND, "No exposition available").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathPolicyKind;
    use crate::observability::{InMemoryTelemetry, PrometheusTelemetry};
    use axum::http::Method;
    use tower::ServiceExt;

    fn router_with(config: ProxyConfig, telemetry: Arc<dyn TelemetrySink>) -> Router {
        HttpServer::new(config, telemetry, Shutdown::new()).unwrap().into_router()
    }

    #[tokio::test]
    async fn test_unrouted_method_rejected() {
        let telemetry = InMemoryTelemetry::new();
        let app = router_with(ProxyConfig::default(), telemetry.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/openai/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(telemetry.count("/openai/v1/models"), 0);
    }

    #[tokio::test]
    async fn test_head_not_proxied() {
        let telemetry = InMemoryTelemetry::new();
        let app = router_with(ProxyConfig::default(), telemetry.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::HEAD)
                    .uri("/openai/v1/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET,POST");
        assert_eq!(telemetry.count("/openai/v1/models"), 0);
        assert_eq!(telemetry.observation_count("/openai/v1/models"), 0);
    }

    #[tokio::test]
    async fn test_bare_prefix_redirects() {
        let telemetry = InMemoryTelemetry::new();
        let app = router_with(ProxyConfig::default(), telemetry.clone());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/openai").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/openai/");

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/openai?limit=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/openai/?limit=2");
        assert_eq!(telemetry.count("/openai"), 0);
    }

    #[tokio::test]
    async fn test_path_outside_prefix_not_found() {
        let app = router_with(ProxyConfig::default(), InMemoryTelemetry::new());
        let response = app
            .oneshot(Request::builder().uri("/other/v1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_rejected_before_dispatch() {
        let mut config = ProxyConfig::default();
        config.upstream.path_policy = PathPolicyKind::RejectTraversal;
        let telemetry = InMemoryTelemetry::new();
        let app = router_with(config, telemetry.clone());

        let response = app
            .oneshot(Request::builder().uri("/openai/v1/../admin").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(telemetry.count("/openai/v1/../admin"), 0);
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let telemetry = Arc::new(PrometheusTelemetry::new().unwrap());
        telemetry.increment("/openai/v1/models");
        let app = router_with(ProxyConfig::default(), telemetry);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], EXPOSITION_CONTENT_TYPE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"http_requests_total{path="/openai/v1/models"} 1"#));
    }

    #[tokio::test]
    async fn test_metrics_route_without_exposition() {
        let app = router_with(ProxyConfig::default(), InMemoryTelemetry::new());
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
