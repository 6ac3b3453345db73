//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy handler produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (latency histogram + request counter per inbound path)
//!
//! Consumers:
//!     → stdout
//!     → metrics path on the proxy listener (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::{InMemoryTelemetry, PrometheusTelemetry, TelemetrySink};
