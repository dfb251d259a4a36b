//! Request instrumentation.
//!
//! `metrics` defines the HTTP metric families on top of the shared registry;
//! `middleware` records them for every routed request.

pub mod metrics;
pub mod middleware;

pub use metrics::HttpMetrics;
