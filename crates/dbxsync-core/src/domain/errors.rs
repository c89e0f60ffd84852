//! Domain error types
//!
//! Errors raised while constructing validated domain values such as
//! relative paths, content hashes and listing cursors.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid content hash (expected 64 lowercase hex characters)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Invalid listing cursor
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Path is not within the configured sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),
}
