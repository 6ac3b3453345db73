//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value shapes (addresses parse, origin is a bare http(s) origin)
//! - Detect the metrics path shadowing the proxied prefix
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("upstream.origin `{0}` is not an absolute http(s) URL")]
    OriginUrl(String),

    #[error("upstream.origin `{0}` must not carry a path, query or fragment")]
    OriginHasPath(String),

    #[error("upstream.route_prefix `{0}` must start with `/` and must not end with `/`")]
    RoutePrefix(String),

    #[error("upstream.body_methods entry `{0}` is not a valid HTTP method")]
    BodyMethod(String),

    #[error("observability.metrics_path `{0}` must start with `/`")]
    MetricsPath(String),

    #[error("observability.metrics_path `{metrics_path}` is shadowed by route prefix `{prefix}`")]
    MetricsPathShadowed { metrics_path: String, prefix: String },

    #[error("observability.upkeep_interval_secs must be greater than zero")]
    UpkeepInterval,
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let origin = &config.upstream.origin;
    match Url::parse(origin) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::OriginHasPath(origin.clone()));
            }
        }
        _ => errors.push(ValidationError::OriginUrl(origin.clone())),
    }

    let prefix = &config.upstream.route_prefix;
    if !prefix.starts_with('/') || prefix.ends_with('/') || prefix.contains(['{', '}']) {
        errors.push(ValidationError::RoutePrefix(prefix.clone()));
    }

    for method in &config.upstream.body_methods {
        if Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::BodyMethod(method.clone()));
        }
    }

    let metrics_path = &config.observability.metrics_path;
    if !metrics_path.starts_with('/') {
        errors.push(ValidationError::MetricsPath(metrics_path.clone()));
    } else if metrics_path == prefix || metrics_path.starts_with(&format!("{prefix}/")) {
        errors.push(ValidationError::MetricsPathShadowed {
            metrics_path: metrics_path.clone(),
            prefix: prefix.clone(),
        });
    }

    if config.observability.upkeep_interval_secs == 0 {
        errors.push(ValidationError::UpkeepInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
