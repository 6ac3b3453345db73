//! Upstream request construction and dispatch.
//!
//! # Responsibilities
//! - Join the fixed origin with the translated path
//! - Copy method and headers verbatim
//! - Stream the inbound body upstream when the method carries one
//! - Hand back the upstream response with its body still open
//!
//! # Design Decisions
//! - One shared client with default settings: no timeout, no retries
//! - Target is an `http::Uri`, so the path reaches the upstream unresolved
//! - Bodies are never buffered; memory is bounded by chunk size
//! - Failures are returned, the caller decides what the client sees

use std::collections::HashSet;

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderMap, Method, Request, Response, Uri},
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::error::ProxyError;

/// Methods whose inbound body is forwarded upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPolicy {
    methods: HashSet<Method>,
}

impl BodyPolicy {
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }

    /// Parse method names from configuration, skipping invalid tokens.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(
            names
                .iter()
                .filter_map(|name| Method::from_bytes(name.as_ref().as_bytes()).ok()),
        )
    }

    pub fn carries_body(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

impl Default for BodyPolicy {
    fn default() -> Self {
        Self::new([Method::POST, Method::PUT])
    }
}

/// Client used for upstream calls: plain HTTP or TLS, HTTP/1.1.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the shared upstream client with default settings.
pub fn build_client() -> Result<UpstreamClient, rustls::Error> {
    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .build();
    Ok(Client::builder(TokioExecutor::new()).build(https))
}

/// Issues requests against the single upstream origin.
#[derive(Clone)]
pub struct UpstreamDispatcher {
    client: UpstreamClient,
    origin: String,
    body_policy: BodyPolicy,
}

impl UpstreamDispatcher {
    /// `origin` is scheme plus authority; a trailing `/` is ignored.
    pub fn new(origin: &str, body_policy: BodyPolicy) -> Result<Self, rustls::Error> {
        Ok(Self {
            client: build_client()?,
            origin: origin.trim_end_matches('/').to_string(),
            body_policy,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn body_policy(&self) -> &BodyPolicy {
        &self.body_policy
    }

    /// Build `<origin><upstream_path>[?query]`.
    ///
    /// The path bytes are kept as they are: `Uri` parsing validates
    /// characters but never resolves `.` or `..` segments.
    pub fn upstream_uri(&self, upstream_path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
        let mut url = format!("{}{}", self.origin, upstream_path);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        Uri::try_from(url.as_str()).map_err(|source| ProxyError::InvalidUpstreamUrl { url, source })
    }

    /// Build the outbound request without sending it.
    pub fn build_request(
        &self,
        method: Method,
        upstream_path: &str,
        query: Option<&str>,
        mut headers: HeaderMap,
        body: Body,
    ) -> Result<Request<Body>, ProxyError> {
        let uri = self.upstream_uri(upstream_path, query)?;
        let forward_body = self.body_policy.carries_body(&method);

        if !forward_body {
            // Framing headers would announce bytes that are never sent.
            headers.remove(header::CONTENT_LENGTH);
            headers.remove(header::TRANSFER_ENCODING);
        }

        let mut request = Request::new(if forward_body { body } else { Body::empty() });
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// Send the request and wait for the upstream response head.
    pub async fn dispatch(
        &self,
        method: Method,
        upstream_path: &str,
        query: Option<&str>,
        headers: HeaderMap,
        body: Body,
    ) -> Result<Response<Incoming>, ProxyError> {
        let request = self.build_request(method, upstream_path, query, headers, body)?;

        tracing::debug!(
            method = %request.method(),
            uri = %request.uri(),
            body = !request.body().is_end_stream(),
            "Dispatching upstream"
        );

        Ok(self.client.request(request).await?)
    }
}
