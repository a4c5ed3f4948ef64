//! HTTP middleware
//!
//! Authentication lives with the rest of the identity core in
//! [`crate::auth::middleware`].

pub mod metrics;

pub use metrics::metrics_middleware;
