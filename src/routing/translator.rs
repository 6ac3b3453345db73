//! Inbound-to-upstream path translation.

use crate::http::error::ProxyError;

/// Strips the routing prefix from inbound paths.
#[derive(Debug, Clone)]
pub struct PathTranslator {
    prefix: String,
}

impl PathTranslator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Return `path` with the first `prefix.len()` bytes removed.
    ///
    /// The router only hands over paths that start with the prefix, so the
    /// leading bytes are cut without being compared.
    pub fn translate<'a>(&self, path: &'a str) -> Result<&'a str, ProxyError> {
        path.get(self.prefix.len()..)
            .ok_or_else(|| ProxyError::PathTooShort {
                path: path.to_string(),
                prefix_len: self.prefix.len(),
            })
    }
}
