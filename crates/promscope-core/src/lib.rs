//! promscope core: in-process metrics registry, label interning, counter and
//! histogram stores, and the text exposition format.
//!
//! This crate carries no HTTP or async runtime dependencies; the server crate
//! wires it to a scrape endpoint.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Recording paths
//! return `MetricsError` instead, so a bad observation can never take down
//! the request that produced it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod atomic;
pub mod counter;
pub mod error;
pub mod exposition;
pub mod histogram;
pub mod interner;
pub mod labels;
pub mod metric;
pub mod registry;
pub mod snapshot;
pub mod tally;

pub use error::{ErrorKind, MetricsError, Result};
pub use histogram::Buckets;
pub use interner::{LabelSetHandle, OverflowPolicy};
pub use labels::LabelSet;
pub use metric::{Counter, Histogram, MetricDescriptor, MetricHandle, MetricKind};
pub use registry::{CardinalityScope, Registry, RegistryOptions};
