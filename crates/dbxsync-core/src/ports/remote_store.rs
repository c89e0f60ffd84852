//! Remote store port (driven/secondary port)
//!
//! This module defines the capability surface the sync engine needs from a
//! remote content store: listing with continuation cursors, long-polling for
//! changes, metadata lookup and the four mutations. The implementation lives
//! in the `dbxsync-dropbox` adapter crate.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - [`RemoteEntry`] is a port-level DTO; the remote scanner maps it to
//!   domain [`RemoteFile`](crate::domain::RemoteFile)s.

use std::time::Duration;

use crate::domain::content_hash::ContentHash;
use crate::domain::newtypes::Cursor;

// ============================================================================
// Listing DTOs
// ============================================================================

/// The `.tag` of a listing or metadata entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTag {
    File,
    Folder,
    Deleted,
}

/// A single entry from a folder listing or metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub tag: EntryTag,
    /// Provider identifier (empty for deleted entries)
    pub id: String,
    /// Last path segment
    pub name: String,
    /// Absolute path with the user's preferred casing
    pub path_display: String,
    /// Content hash, present for files only
    pub content_hash: Option<ContentHash>,
}

/// One page of a folder listing
#[derive(Debug, Clone)]
pub struct ListFolderPage {
    pub entries: Vec<RemoteEntry>,
    /// Cursor covering everything listed up to and including this page
    pub cursor: Cursor,
    /// Whether another page can be fetched right away with `cursor`
    pub has_more: bool,
}

/// Answer to a long-poll request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongPollResult {
    /// New changes are available under the polled cursor
    pub changes: bool,
    /// Server-requested wait before the next long-poll
    pub backoff: Option<Duration>,
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for remote content store operations
///
/// ## Implementation Notes
///
/// - Every failing response (HTTP status >= 400) must surface as an error
///   that includes the server's payload.
/// - Implementations must not retry internally; the sync engine decides
///   what a failure means.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Lists the first page of `path`'s entries
    async fn list_folder(&self, path: &str, recursive: bool) -> anyhow::Result<ListFolderPage>;

    /// Fetches the page following `cursor`
    async fn list_folder_continue(&self, cursor: &Cursor) -> anyhow::Result<ListFolderPage>;

    /// Blocks until changes exist under `cursor` or the server-side timeout expires
    async fn longpoll(&self, cursor: &Cursor, timeout: Duration) -> anyhow::Result<LongPollResult>;

    /// Looks up a single path; a missing path is an error
    async fn get_metadata(&self, path: &str) -> anyhow::Result<RemoteEntry>;

    /// Downloads a file's contents
    async fn download(&self, path: &str) -> anyhow::Result<Vec<u8>>;

    /// Uploads `data` to `path` without overwriting or renaming
    async fn upload(&self, path: &str, data: Vec<u8>) -> anyhow::Result<RemoteEntry>;

    /// Creates a folder at `path` without renaming on conflict
    async fn create_folder(&self, path: &str) -> anyhow::Result<RemoteEntry>;

    /// Deletes a file or folder (recursively)
    async fn delete(&self, path: &str) -> anyhow::Result<()>;
}
