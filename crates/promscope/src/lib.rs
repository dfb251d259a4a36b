//! Top-level facade crate for promscope.
//!
//! Re-exports the metrics core and the server library so users can depend on a single crate.

pub mod core {
    pub use promscope_core::*;
}

pub mod server {
    pub use promscope_server::*;
}
