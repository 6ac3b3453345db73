//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path (always starts with the routing prefix)
//!     → translator.rs (strip the prefix)
//!     → policy.rs (vet the remainder: passthrough by default)
//!     → upstream path handed to the dispatcher
//! ```
//!
//! # Design Decisions
//! - Prefix is fixed at startup, matched by the axum router
//! - No decoding, escaping or normalisation in the default policy
//! - Policies are swappable without touching the dispatcher

pub mod policy;
pub mod translator;

pub use policy::{PassthroughPathPolicy, PathPolicy, RejectTraversalPolicy};
pub use translator::PathTranslator;
