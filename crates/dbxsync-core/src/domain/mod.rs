//! Domain entities and business logic
//!
//! This module contains the core domain types for dbxsync:
//! - Newtypes for relative paths and listing cursors
//! - The Dropbox content hash
//! - Files and change actions produced by the scanners
//! - Domain-specific error types

pub mod action;
pub mod content_hash;
pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use action::{Action, ActionKind, FileKind, LocalAction, LocalFile, RemoteAction, RemoteFile};
pub use content_hash::{ContentHash, ContentHasher};
pub use errors::DomainError;
pub use newtypes::*;
