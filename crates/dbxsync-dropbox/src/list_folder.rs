//! Dropbox folder listing for incremental synchronization
//!
//! ## Listing Flow
//!
//! 1. **Initial listing**: [`list_folder`] returns the first page of a
//!    recursive listing together with a cursor
//! 2. **Follow pages**: while `has_more` is set, [`list_folder_continue`]
//!    returns the next page and a new cursor
//! 3. **Wait for changes**: [`longpoll`] blocks on the notify host until the
//!    cursor has changes (or the timeout expires), then go back to step 2
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbxsync_dropbox::client::DropboxClient;
//! use dbxsync_dropbox::list_folder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DropboxClient::new("access-token");
//! let page = list_folder::list_folder(&client, "/notes", true).await?;
//! println!("Got {} entries", page.entries.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use dbxsync_core::domain::newtypes::Cursor;
use dbxsync_core::ports::remote_store::{EntryTag, ListFolderPage, LongPollResult};

use crate::client::DropboxClient;
use crate::files::{DropboxMetadata, EntryParser};
use crate::DropboxError;

const LIST_FOLDER: &str = "/2/files/list_folder";
const LIST_FOLDER_CONTINUE: &str = "/2/files/list_folder/continue";
const LONGPOLL: &str = "/2/files/list_folder/longpoll";

// ============================================================================
// Dropbox API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
    include_media_info: bool,
    include_deleted: bool,
    include_mounted_folders: bool,
}

#[derive(Debug, Serialize)]
struct CursorArg<'a> {
    cursor: &'a str,
}

#[derive(Debug, Serialize)]
struct LongpollArg<'a> {
    cursor: &'a str,
    timeout: u64,
}

/// Raw response of `list_folder` and `list_folder/continue`
#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    #[serde(default)]
    entries: Vec<DropboxMetadata>,
    cursor: String,
    has_more: bool,
}

/// Raw response of `list_folder/longpoll`
#[derive(Debug, Deserialize)]
struct LongpollResponse {
    changes: bool,
    /// Seconds to wait before polling again
    backoff: Option<u64>,
}

fn parse_page(endpoint: &str, response: ListFolderResponse) -> Result<ListFolderPage, DropboxError> {
    let entries = response
        .entries
        .into_iter()
        .map(|m| EntryParser::parse(endpoint, m, EntryTag::File))
        .collect::<Result<Vec<_>, _>>()?;

    let cursor = Cursor::new(response.cursor).map_err(|e| DropboxError::InvalidResponse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;

    Ok(ListFolderPage {
        entries,
        cursor,
        has_more: response.has_more,
    })
}

// ============================================================================
// Operations
// ============================================================================

/// Fetches the first page of `path`'s entries
///
/// Deleted entries and media info are excluded; mounted (shared) folders
/// are included.
pub async fn list_folder(client: &DropboxClient, path: &str, recursive: bool) -> Result<ListFolderPage> {
    let response: ListFolderResponse = client
        .rpc(
            LIST_FOLDER,
            &ListFolderArg {
                path,
                recursive,
                include_media_info: false,
                include_deleted: false,
                include_mounted_folders: true,
            },
        )
        .await
        .with_context(|| format!("can't fetch folder page {path}"))?;

    let page = parse_page(LIST_FOLDER, response).context("can't parse folder page entries")?;
    debug!(
        path,
        entries = page.entries.len(),
        has_more = page.has_more,
        "Fetched first folder page"
    );
    Ok(page)
}

/// Fetches the page that follows `cursor`
pub async fn list_folder_continue(client: &DropboxClient, cursor: &Cursor) -> Result<ListFolderPage> {
    let response: ListFolderResponse = client
        .rpc(
            LIST_FOLDER_CONTINUE,
            &CursorArg {
                cursor: cursor.as_str(),
            },
        )
        .await
        .context("can't fetch next folder page")?;

    let page =
        parse_page(LIST_FOLDER_CONTINUE, response).context("can't parse folder page entries")?;
    debug!(
        entries = page.entries.len(),
        has_more = page.has_more,
        "Fetched next folder page"
    );
    Ok(page)
}

/// Waits for changes under `cursor`
///
/// Dropbox holds the request open for `timeout` (plus some jitter) and
/// answers early as soon as something changes.
pub async fn longpoll(client: &DropboxClient, cursor: &Cursor, timeout: Duration) -> Result<LongPollResult> {
    let response: LongpollResponse = client
        .notify_rpc(
            LONGPOLL,
            &LongpollArg {
                cursor: cursor.as_str(),
                timeout: timeout.as_secs(),
            },
        )
        .await
        .context("can't long-poll for folder changes")?;

    debug!(
        changes = response.changes,
        backoff = ?response.backoff,
        "Long-poll answered"
    );
    Ok(LongPollResult {
        changes: response.changes,
        backoff: response.backoff.map(Duration::from_secs),
    })
}
