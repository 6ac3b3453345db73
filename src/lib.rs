//! Prefix reverse proxy library.
//!
//! Forwards everything under one routing prefix to a single upstream origin
//! and records per-path latency and request counts.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
