//! Error types for DynamicKV
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors are raised typed by the storage and engine layers and converted to
//! HTTP status codes in exactly one place, the gateway. No layer below the
//! gateway formats user-facing messages.

use std::io;
use thiserror::Error;

/// Result type alias for DynamicKV operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the DynamicKV store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, directory scans)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Requested id absent in the addressed collection
    #[error("not found: {collection}/{id}")]
    NotFound {
        /// Collection that was addressed
        collection: String,
        /// Record id that was requested
        id: String,
    },

    /// Malformed request body or query parameters
    #[error("validation error: {0}")]
    Validation(String),

    /// Record codec cannot represent a value
    #[error("encode error: {0}")]
    Encode(String),

    /// Record codec cannot parse input bytes
    #[error("decode error: {0}")]
    Decode(String),

    /// Persistence backend failure; the mutation was aborted
    #[error("storage error: {0}")]
    Storage(String),

    /// Previously persisted data failed verification
    #[error("data corruption: {0}")]
    Corruption(String),
}

impl Error {
    /// Construct a `NotFound` error for a collection/id pair
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Construct a `Validation` error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Construct a `Storage` error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Construct a `Corruption` error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// True if this error means "the record does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::not_found("products", "product_17");
        let msg = err.to_string();
        assert!(msg.contains("products"));
        assert!(msg.contains("product_17"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_validation() {
        let err = Error::validation("min must not exceed max");
        let msg = err.to_string();
        assert!(msg.contains("validation error"));
        assert!(msg.contains("min must not exceed max"));
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::storage("append failed");
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("append failed"));
    }

    #[test]
    fn test_error_display_corruption() {
        let err = Error::corruption("checksum mismatch at offset 128");
        let msg = err.to_string();
        assert!(msg.contains("data corruption"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_is_not_found_only_for_not_found() {
        assert!(!Error::validation("x").is_not_found());
        assert!(!Error::storage("x").is_not_found());
        assert!(Error::not_found("c", "i").is_not_found());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        fn returns_error() -> Result<i32> {
            Err(Error::validation("test"))
        }

        assert_eq!(returns_result().unwrap(), 42);
        assert!(returns_error().is_err());
    }
}
