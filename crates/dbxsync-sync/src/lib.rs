//! dbxsync Sync - Bidirectional synchronization engine
//!
//! Provides:
//! - A remote scanner that pages through a Dropbox folder listing and then
//!   long-polls for changes
//! - A local scanner that turns filesystem watch events into actions
//! - A synchronizer that drains both scanners and applies their actions to
//!   the opposite side
//!
//! ## Modules
//!
//! - [`scanner`] - The pull-based [`Scanner`](scanner::Scanner) contract
//! - [`remote_scanner`] - Folder listing and long-poll change stream
//! - [`watcher`] - Filesystem watcher, local scanner and watch set
//! - [`engine`] - The [`Synchronizer`](engine::Synchronizer) drain loops

pub mod engine;
pub mod remote_scanner;
pub mod scanner;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that stop a scanner or a drain loop
///
/// Payloads are rendered strings so a scanner can keep its terminal error
/// and hand out copies of it on every later call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A remote store operation failed
    #[error("{operation} {path}: {message}")]
    Remote {
        /// What was attempted, e.g. "can't upload"
        operation: &'static str,
        /// Remote path the operation concerned
        path: String,
        /// Full error chain of the underlying failure
        message: String,
    },

    /// A local filesystem operation failed
    #[error("IO error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// The filesystem watcher failed or its event stream closed
    #[error("Watch error: {0}")]
    Watch(String),

    /// A scanner stopped producing actions without recording an error
    #[error("Change stream ended unexpectedly")]
    Exhausted,
}

impl SyncError {
    pub(crate) fn remote(
        operation: &'static str,
        path: impl Into<String>,
        err: impl Into<anyhow::Error>,
    ) -> Self {
        let path = path.into();
        SyncError::Remote {
            operation,
            path: if path.is_empty() { "/".to_string() } else { path },
            message: format!("{:#}", err.into()),
        }
    }

    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        SyncError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
