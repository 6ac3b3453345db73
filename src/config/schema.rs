//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to defaults that reproduce the stock deployment
//! (`/openai` on port 8080 forwarded to `https://api.openai.com`).

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream origin and forwarding policies.
    pub upstream: UpstreamConfig,

    /// Logging and metrics exposition settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How the translated path is vetted before it is appended to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PathPolicyKind {
    /// Forward the path exactly as received.
    #[default]
    Passthrough,
    /// Refuse paths containing `.` or `..` segments.
    RejectTraversal,
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and authority of the single upstream (no path, no query).
    pub origin: String,

    /// Routing prefix stripped from inbound paths (leading `/`, no trailing `/`).
    pub route_prefix: String,

    /// Methods whose inbound body is streamed upstream.
    pub body_methods: Vec<String>,

    /// Path vetting applied after the prefix is stripped.
    pub path_policy: PathPolicyKind,

    /// Shut the process down after answering a failed upstream dispatch.
    pub fail_fast: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "https://api.openai.com".to_string(),
            route_prefix: "/openai".to_string(),
            body_methods: vec!["POST".to_string(), "PUT".to_string()],
            path_policy: PathPolicyKind::Passthrough,
            fail_fast: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Path the text exposition is served on.
    pub metrics_path: String,

    /// Seconds between histogram upkeep runs.
    pub upkeep_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_path: "/metrics".to_string(),
            upkeep_interval_secs: 5,
        }
    }
}
