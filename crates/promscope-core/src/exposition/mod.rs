//! Pull-scrape exposition (Prometheus text format 0.0.4).
//!
//! - `text`: encoder from a `RegistrySnapshot` to bytes.
//! - `parse`: reader for the same subset, used to check encoder output.
//!
//! Neither side panics on odd input: encode failures and malformed lines are
//! reported as `MetricsError`.

pub mod parse;
pub mod text;

pub use parse::{parse_text, ParsedSample};
pub use text::{TextEncoder, TEXT_CONTENT_TYPE};
