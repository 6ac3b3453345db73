//! Response relay.
//!
//! # Responsibilities
//! - Copy upstream status and headers onto the client response
//! - Stream the upstream body through unchanged
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Headers are copied as-is, hop-by-hop ones included
//! - A body error after the head was sent cannot be reported; it is
//!   logged and the client sees a truncated body

use axum::{
    body::{Body, HttpBody},
    http::Response as HttpResponse,
    response::Response,
    BoxError,
};
use futures_util::TryStreamExt;

/// Turn an upstream response into the response for the original caller.
///
/// The upstream body is released once the returned body is drained or
/// dropped.
pub fn relay<B>(upstream: HttpResponse<B>, path: &str) -> Response
where
    B: HttpBody<Data = axum::body::Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = upstream.into_parts();

    let path = path.to_string();
    let body = Body::new(body).into_data_stream().inspect_err(move |e| {
        tracing::warn!(path = %path, error = %e, "Error copying response body");
    });

    Response::from_parts(parts, Body::from_stream(body))
}
