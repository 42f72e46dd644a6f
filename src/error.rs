//! Error types for the caches
//!
//! Provides unified error handling using thiserror. Misses are not errors:
//! lookups report absence through `Option` and `bool`, so the only failures
//! here happen at construction time.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Rejected construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Background cleanup was requested outside a Tokio runtime
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

// == Result Type Alias ==
/// Convenience Result type for the caches.
pub type Result<T> = std::result::Result<T, CacheError>;
