//! Shared error type across promscope crates.

use thiserror::Error;

/// Stable error codes (used as metric label values and for HTTP mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Name already registered with a different shape.
    NameCollision,
    /// Label set would exceed the cardinality ceiling.
    CardinalityExceeded,
    /// Negative or NaN counter delta.
    InvalidDelta,
    /// NaN histogram observation.
    InvalidObservation,
    /// Malformed metric name, label name, or bucket list.
    InvalidInput,
    /// Exposition encode/parse failure.
    Format,
    /// Configuration rejected.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NameCollision => "name_collision",
            ErrorKind::CardinalityExceeded => "cardinality_exceeded",
            ErrorKind::InvalidDelta => "invalid_delta",
            ErrorKind::InvalidObservation => "invalid_observation",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Format => "format",
            ErrorKind::BadConfig => "bad_config",
            ErrorKind::UnsupportedVersion => "unsupported_version",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and server.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    #[error("metric name already registered: {name} ({existing})")]
    NameCollision { name: String, existing: String },
    #[error("metric {metric} exceeded its cardinality limit of {limit} label sets")]
    CardinalityExceeded { metric: String, limit: usize },
    #[error("invalid counter delta: {0}")]
    InvalidDelta(f64),
    #[error("invalid observation: {0}")]
    InvalidObservation(f64),
    #[error("invalid metric name: {0}")]
    InvalidName(String),
    #[error("invalid label: {0}")]
    InvalidLabel(String),
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("parse failed at line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map an error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::NameCollision { .. } => ErrorKind::NameCollision,
            MetricsError::CardinalityExceeded { .. } => ErrorKind::CardinalityExceeded,
            MetricsError::InvalidDelta(_) => ErrorKind::InvalidDelta,
            MetricsError::InvalidObservation(_) => ErrorKind::InvalidObservation,
            MetricsError::InvalidName(_)
            | MetricsError::InvalidLabel(_)
            | MetricsError::InvalidBuckets(_) => ErrorKind::InvalidInput,
            MetricsError::Encode(_) | MetricsError::Parse { .. } => ErrorKind::Format,
            MetricsError::BadConfig(_) => ErrorKind::BadConfig,
            MetricsError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            MetricsError::Internal(_) => ErrorKind::Internal,
        }
    }
}
