//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, prefix + metrics routes)
//!     → routing (strip prefix, apply path policy)
//!     → request.rs (build and send the upstream request)
//!     → response.rs (relay status, headers, body)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use request::{BodyPolicy, UpstreamDispatcher};
pub use server::HttpServer;
