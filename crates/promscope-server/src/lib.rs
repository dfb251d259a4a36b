//! promscope server library entry.
//!
//! Wires the metrics core to an axum application: strict YAML config, shared
//! state owning the registry, request instrumentation with per-request tags,
//! and the scrape endpoint. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
