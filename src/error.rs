//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Absence of a key is never an error: lookups report it through
/// `Option`/`bool` return values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity must be a positive number of entries
    #[error("Invalid capacity: {0} (must be greater than zero)")]
    InvalidCapacity(usize),

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
