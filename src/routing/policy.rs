//! Upstream path policies.
//!
//! The translated path is appended to the origin verbatim. Whether that is
//! acceptable is decided here, so a stricter rule can be plugged in without
//! touching the dispatcher.

use std::fmt::Debug;

use crate::config::PathPolicyKind;
use crate::http::error::ProxyError;

/// Vets a translated path before dispatch.
pub trait PathPolicy: Send + Sync + Debug {
    fn check(&self, upstream_path: &str) -> Result<(), ProxyError>;
}

/// Accepts every path, including `..` segments and encoded separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPathPolicy;

impl PathPolicy for PassthroughPathPolicy {
    fn check(&self, _upstream_path: &str) -> Result<(), ProxyError> {
        Ok(())
    }
}

/// Refuses paths with `.` or `..` segments, plain or percent-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectTraversalPolicy;

impl PathPolicy for RejectTraversalPolicy {
    fn check(&self, upstream_path: &str) -> Result<(), ProxyError> {
        let traverses = upstream_path.split('/').any(|segment| {
            let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
            decoded == "." || decoded == ".."
        });
        if traverses {
            return Err(ProxyError::PathRejected(upstream_path.to_string()));
        }
        Ok(())
    }
}

/// Build the policy selected in configuration.
pub fn from_kind(kind: PathPolicyKind) -> Box<dyn PathPolicy> {
    match kind {
        PathPolicyKind::Passthrough => Box::new(PassthroughPathPolicy),
        PathPolicyKind::RejectTraversal => Box::new(RejectTraversalPolicy),
    }
}
