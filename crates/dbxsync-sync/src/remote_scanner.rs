//! Remote change stream
//!
//! The [`RemoteScanner`] walks a Dropbox folder listing page by page and,
//! once the listing is drained, long-polls the notify host until something
//! changes under its cursor. Each listing entry becomes one [`RemoteAction`].
//!
//! ## States
//!
//! ```text
//! Uninitialized ──list_folder──→ Draining ──has_more──→ list_folder/continue
//!                                   │                           │
//!                                   └──drained──→ LongPolling ──changes──┘
//! ```
//!
//! Any failure moves the scanner to a terminal error state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use dbxsync_core::domain::{FileKind, RelativePath, RemoteAction, RemoteFile};
use dbxsync_core::domain::newtypes::Cursor;
use dbxsync_core::ports::remote_store::{EntryTag, IRemoteStore, ListFolderPage, RemoteEntry};

use crate::scanner::Scanner;
use crate::SyncError;

/// Server-side timeout requested for each long-poll
pub const LONGPOLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Scanner over the entries of one Dropbox folder tree
pub struct RemoteScanner {
    store: Arc<dyn IRemoteStore>,
    /// Remote root, `""` for the whole Dropbox
    root: String,
    /// Actions of the last fetched page not yet handed out
    buffer: VecDeque<RemoteAction>,
    cursor: Option<Cursor>,
    has_more: bool,
    /// Wait requested by the last long-poll answer
    backoff: Option<Duration>,
    current: Option<RemoteAction>,
    error: Option<SyncError>,
}

impl RemoteScanner {
    pub fn new(store: Arc<dyn IRemoteStore>, root: impl Into<String>) -> Self {
        Self {
            store,
            root: root.into(),
            buffer: VecDeque::new(),
            cursor: None,
            has_more: false,
            backoff: None,
            current: None,
            error: None,
        }
    }

    /// Cursor of the last fetched page
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    async fn fetch_first_page(&mut self) -> Result<(), SyncError> {
        let page = self
            .store
            .list_folder(&self.root, true)
            .await
            .map_err(|e| SyncError::remote("can't fetch folder page", self.root.as_str(), e))?;
        self.load_page(page)
    }

    async fn fetch_next_page(&mut self, cursor: Cursor) -> Result<(), SyncError> {
        let page = self
            .store
            .list_folder_continue(&cursor)
            .await
            .map_err(|e| SyncError::remote("can't fetch next folder page", self.root.as_str(), e))?;
        self.load_page(page)
    }

    fn load_page(&mut self, page: ListFolderPage) -> Result<(), SyncError> {
        let actions = page
            .entries
            .into_iter()
            .map(|entry| self.to_action(entry))
            .collect::<Result<VecDeque<_>, _>>()?;

        debug!(
            root = %self.root,
            actions = actions.len(),
            has_more = page.has_more,
            "Loaded folder page"
        );
        self.buffer = actions;
        self.cursor = Some(page.cursor);
        self.has_more = page.has_more;
        Ok(())
    }

    fn to_action(&self, entry: RemoteEntry) -> Result<RemoteAction, SyncError> {
        let relative_path = RelativePath::from_remote(&self.root, &entry.path_display)
            .map_err(|e| SyncError::remote("can't map folder entry", entry.path_display.as_str(), e))?;

        let kind = match entry.tag {
            EntryTag::Folder => FileKind::Folder,
            EntryTag::File | EntryTag::Deleted => FileKind::File,
        };
        let name = if entry.name.is_empty() {
            relative_path.file_name().unwrap_or_default().to_string()
        } else {
            entry.name
        };

        let file = RemoteFile {
            id: entry.id,
            content_hash: entry.content_hash,
            name,
            relative_path,
            remote_path: entry.path_display,
            kind,
        };

        Ok(match entry.tag {
            EntryTag::Deleted => RemoteAction::delete(file),
            EntryTag::File | EntryTag::Folder => RemoteAction::create(file),
        })
    }

    /// Long-polls until the server reports changes under `cursor`
    async fn wait_for_changes(&mut self, cursor: &Cursor) -> Result<(), SyncError> {
        loop {
            if let Some(backoff) = self.backoff {
                debug!(seconds = backoff.as_secs(), "Backing off before long-poll");
                tokio::time::sleep(backoff).await;
                self.backoff = None;
            }

            let result = self
                .store
                .longpoll(cursor, LONGPOLL_TIMEOUT)
                .await
                .map_err(|e| SyncError::remote("can't long-poll", self.root.as_str(), e))?;
            self.backoff = result.backoff;

            if result.changes {
                debug!(root = %self.root, "Remote changes available");
                self.has_more = true;
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl Scanner for RemoteScanner {
    type Item = RemoteAction;

    async fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }

        loop {
            if let Some(action) = self.buffer.pop_front() {
                self.current = Some(action);
                return true;
            }

            let step = match self.cursor.clone() {
                None => {
                    info!(root = %self.root, "Listing remote folder");
                    self.fetch_first_page().await
                }
                Some(cursor) if self.has_more => self.fetch_next_page(cursor).await,
                Some(cursor) => self.wait_for_changes(&cursor).await,
            };

            if let Err(e) = step {
                error!(error = %e, "Remote scanner stopped");
                self.current = None;
                self.error = Some(e);
                return false;
            }
        }
    }

    fn current(&self) -> Option<&RemoteAction> {
        self.current.as_ref()
    }

    fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }
}
