//! Error types for the loiter crate.

use thiserror::Error;

/// Errors raised while building a query recipe or materializing results.
///
/// Recipe errors (`InvalidLookup`, `UnknownComparator`, `InvalidPattern`)
/// surface from the chain call itself, before any record is touched.
/// Record errors (`Resolution`, `TypeMismatch`, `Incomparable`) surface
/// from the materializing call that evaluated the offending record and end
/// that materialization; no record is silently skipped.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Lookup key with an empty attribute path or an empty path segment.
    #[error("invalid lookup '{0}': empty attribute path")]
    InvalidLookup(String),

    /// Comparator tag not present in the registry.
    #[error("unknown comparator '{0}'")]
    UnknownComparator(String),

    /// Invalid regular expression passed to the `regex` comparator.
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An attribute path segment is missing on the record under evaluation.
    #[error("cannot resolve segment '{segment}' of '{path}'")]
    Resolution { path: String, segment: String },

    /// Comparator applied to operand types it does not support.
    #[error("comparator '{cmp}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        cmp: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Values from different families used as ordering operands or sort keys.
    #[error("cannot compare {left} with {right}")]
    Incomparable {
        left: &'static str,
        right: &'static str,
    },

    /// A one-shot source was materialized a second time.
    #[error("source already consumed; one-shot sources cannot be re-iterated")]
    SourceExhausted,
}

/// Result type for loiter operations.
pub type Result<T> = std::result::Result<T, QueryError>;
