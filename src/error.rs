//! Error Types and Handling
//!
//! Error types for the semantic cache. All fallible operations return
//! [`Result<T>`], an alias for `std::result::Result<T, SemcacheError>`.
//!
//! # Error Propagation
//!
//! Use the `?` operator to propagate errors:
//!
//! ```rust,ignore
//! use semcache::{CacheConfig, CacheStore, Result};
//!
//! fn open_cache(dir: &str) -> Result<CacheStore> {
//!     let store = CacheStore::open(CacheConfig::new(dir))?; // Propagates Io, etc.
//!     Ok(store)
//! }
//! ```
//!
//! Corrupt persisted records are *not* surfaced through these types: the
//! store deletes and skips them during load. Only genuine storage failures
//! (permissions, disk full) propagate.

use thiserror::Error;

/// Error types for semantic cache operations
#[derive(Error, Debug)]
pub enum SemcacheError {
    /// I/O error from the durable cache directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for semantic cache operations
pub type Result<T> = std::result::Result<T, SemcacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SemcacheError = io_err.into();
        assert!(matches!(err, SemcacheError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SemcacheError = parse_err.into();
        assert!(matches!(err, SemcacheError::Serialization(_)));
    }

    #[test]
    fn test_error_display() {
        let err = SemcacheError::InvalidConfig("ttl_days must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: ttl_days must be positive"
        );
    }
}
