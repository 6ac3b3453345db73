//! Request-path errors and their single mapping onto HTTP responses.

use axum::{
    http::{uri::InvalidUri, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Everything that can stop a request before the relay starts.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("path `{path}` is shorter than the {prefix_len}-byte routing prefix")]
    PathTooShort { path: String, prefix_len: usize },

    #[error("path `{0}` rejected by path policy")]
    PathRejected(String),

    #[error("invalid upstream URL `{url}`: {source}")]
    InvalidUpstreamUrl {
        url: String,
        #[source]
        source: InvalidUri,
    },

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::PathTooShort { .. } | ProxyError::PathRejected(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidUpstreamUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// True for failures of the upstream call itself.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            ProxyError::InvalidUpstreamUrl { .. } | ProxyError::Upstream(_)
        )
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::BAD_REQUEST => "Invalid proxy path",
            StatusCode::BAD_GATEWAY => "Upstream request failed",
            _ => "Internal server error",
        };
        (status, message).into_response()
    }
}
