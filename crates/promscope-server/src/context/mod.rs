//! Per-request context types shared across layers.
//!
//! `RequestTags` lets any stage of the request pipeline attach labels that
//! are recorded once the response is produced, without ambient lookups.

pub mod tags;

pub use tags::RequestTags;
