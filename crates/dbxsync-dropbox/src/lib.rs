//! dbxsync Dropbox - Dropbox API v2 client
//!
//! Provides async client for:
//! - OAuth2 authentication (no-redirect authorization code flow)
//! - Folder listing with cursors and long-poll change notification
//! - File metadata, download, upload, folder creation and deletion
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 code flow and keyring token storage
//! - [`client`] - Dropbox HTTP client (RPC, content and notify hosts)
//! - [`files`] - Metadata lookup and file mutations
//! - [`list_folder`] - Folder listing, continuation and long-poll
//! - [`provider`] - [`IRemoteStore`](dbxsync_core::ports::IRemoteStore) implementation

pub mod auth;
pub mod client;
pub mod files;
pub mod list_folder;
pub mod provider;

use thiserror::Error;

/// Errors that can occur when talking to the Dropbox API
#[derive(Debug, Error)]
pub enum DropboxError {
    /// The server answered with an error status (>= 400)
    #[error("{endpoint} failed with HTTP {status}: {body}")]
    Api {
        /// API endpoint, e.g. `/2/files/upload`
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        body: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response could not be parsed or was malformed
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse {
        /// API endpoint that produced the response
        endpoint: String,
        /// What was wrong with it
        message: String,
    },

    /// A request argument could not be encoded
    #[error("Invalid request argument: {0}")]
    InvalidArgument(String),
}

impl DropboxError {
    /// Returns true for Dropbox's `path/not_found` lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, DropboxError::Api { status: 409, body, .. } if body.contains("not_found"))
    }
}
