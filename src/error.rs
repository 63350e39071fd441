//! Error types for the cache
//!
//! Cache operations themselves never fail. Errors only come from parsing
//! durations and from constructing a sweeping cache without a runtime.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A duration or TTL string could not be parsed
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A background sweep task was requested outside a Tokio runtime
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;
