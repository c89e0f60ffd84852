//! In-memory remote store for engine and scanner tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use dbxsync_core::domain::content_hash::ContentHash;
use dbxsync_core::domain::newtypes::Cursor;
use dbxsync_core::ports::remote_store::{
    EntryTag, IRemoteStore, ListFolderPage, LongPollResult, RemoteEntry,
};

/// A call received by [`MockRemoteStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ListFolder(String),
    ListFolderContinue(String),
    Longpoll(String),
    GetMetadata(String),
    Download(String),
    Upload(String, Vec<u8>),
    CreateFolder(String),
    Delete(String),
}

struct StoredEntry {
    entry: RemoteEntry,
    data: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    list_pages: VecDeque<ListFolderPage>,
    continue_pages: VecDeque<ListFolderPage>,
    longpolls: VecDeque<LongPollResult>,
    /// Keyed by lowercased path, like Dropbox
    entries: HashMap<String, StoredEntry>,
    calls: Vec<Call>,
}

/// Scripted listing responses plus a small case-insensitive file tree
///
/// Listing, continue and long-poll answers are consumed in order; once a
/// script runs out the call fails.
#[derive(Default)]
pub(crate) struct MockRemoteStore {
    state: Mutex<MockState>,
}

impl MockRemoteStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_list_page(&self, page: ListFolderPage) {
        self.state.lock().unwrap().list_pages.push_back(page);
    }

    pub(crate) fn push_continue_page(&self, page: ListFolderPage) {
        self.state.lock().unwrap().continue_pages.push_back(page);
    }

    pub(crate) fn push_longpoll(&self, changes: bool, backoff: Option<Duration>) {
        self.state
            .lock()
            .unwrap()
            .longpolls
            .push_back(LongPollResult { changes, backoff });
    }

    pub(crate) fn add_file(&self, path: &str, data: &[u8]) {
        self.state.lock().unwrap().entries.insert(
            path.to_lowercase(),
            StoredEntry {
                entry: file_entry(path, data),
                data: data.to_vec(),
            },
        );
    }

    pub(crate) fn add_folder(&self, path: &str) {
        self.state.lock().unwrap().entries.insert(
            path.to_lowercase(),
            StoredEntry {
                entry: folder_entry(path),
                data: Vec::new(),
            },
        );
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn contains(&self, path: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .entries
            .contains_key(&path.to_lowercase())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl IRemoteStore for MockRemoteStore {
    async fn list_folder(&self, path: &str, recursive: bool) -> Result<ListFolderPage> {
        assert!(recursive, "listing must be recursive");
        self.record(Call::ListFolder(path.to_string()));
        self.state
            .lock()
            .unwrap()
            .list_pages
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted list_folder response"))
    }

    async fn list_folder_continue(&self, cursor: &Cursor) -> Result<ListFolderPage> {
        self.record(Call::ListFolderContinue(cursor.as_str().to_string()));
        self.state
            .lock()
            .unwrap()
            .continue_pages
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted list_folder/continue response"))
    }

    async fn longpoll(&self, cursor: &Cursor, _timeout: Duration) -> Result<LongPollResult> {
        self.record(Call::Longpoll(cursor.as_str().to_string()));
        self.state
            .lock()
            .unwrap()
            .longpolls
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted longpoll response"))
    }

    async fn get_metadata(&self, path: &str) -> Result<RemoteEntry> {
        self.record(Call::GetMetadata(path.to_string()));
        let state = self.state.lock().unwrap();
        match state.entries.get(&path.to_lowercase()) {
            Some(stored) => Ok(stored.entry.clone()),
            None => bail!("get_metadata failed with HTTP 409: path/not_found/"),
        }
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        self.record(Call::Download(path.to_string()));
        let state = self.state.lock().unwrap();
        match state.entries.get(&path.to_lowercase()) {
            Some(stored) if stored.entry.tag == EntryTag::File => Ok(stored.data.clone()),
            _ => bail!("download failed with HTTP 409: path/not_found/"),
        }
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<RemoteEntry> {
        self.record(Call::Upload(path.to_string(), data.clone()));
        let mut state = self.state.lock().unwrap();
        let entry = file_entry(path, &data);
        if let Some(existing) = state.entries.get(&path.to_lowercase()) {
            if existing.entry.content_hash != entry.content_hash {
                bail!("upload failed with HTTP 409: path/conflict/file/");
            }
        }
        state.entries.insert(
            path.to_lowercase(),
            StoredEntry {
                entry: entry.clone(),
                data,
            },
        );
        Ok(entry)
    }

    async fn create_folder(&self, path: &str) -> Result<RemoteEntry> {
        self.record(Call::CreateFolder(path.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.entries.contains_key(&path.to_lowercase()) {
            bail!("create_folder_v2 failed with HTTP 409: path/conflict/folder/");
        }
        let entry = folder_entry(path);
        state.entries.insert(
            path.to_lowercase(),
            StoredEntry {
                entry: entry.clone(),
                data: Vec::new(),
            },
        );
        Ok(entry)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record(Call::Delete(path.to_string()));
        let mut state = self.state.lock().unwrap();
        let key = path.to_lowercase();
        if state.entries.remove(&key).is_none() {
            bail!("delete_v2 failed with HTTP 409: path_lookup/not_found/");
        }
        let subtree = format!("{key}/");
        state.entries.retain(|k, _| !k.starts_with(&subtree));
        Ok(())
    }
}

// ============================================================================
// Entry builders
// ============================================================================

fn name_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

pub(crate) fn file_entry(path: &str, data: &[u8]) -> RemoteEntry {
    RemoteEntry {
        tag: EntryTag::File,
        id: format!("id:{path}"),
        name: name_of(path),
        path_display: path.to_string(),
        content_hash: Some(ContentHash::from_bytes(data)),
    }
}

pub(crate) fn folder_entry(path: &str) -> RemoteEntry {
    RemoteEntry {
        tag: EntryTag::Folder,
        id: format!("id:{path}"),
        name: name_of(path),
        path_display: path.to_string(),
        content_hash: None,
    }
}

pub(crate) fn deleted_entry(path: &str) -> RemoteEntry {
    RemoteEntry {
        tag: EntryTag::Deleted,
        id: String::new(),
        name: name_of(path),
        path_display: path.to_string(),
        content_hash: None,
    }
}

pub(crate) fn page(entries: Vec<RemoteEntry>, cursor: &str, has_more: bool) -> ListFolderPage {
    ListFolderPage {
        entries,
        cursor: Cursor::new(cursor.to_string()).unwrap(),
        has_more,
    }
}
