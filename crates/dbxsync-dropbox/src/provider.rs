//! IRemoteStore implementation for the Dropbox API
//!
//! Delegates to the [`list_folder`](crate::list_folder) and
//! [`files`](crate::files) modules to fulfil the port contract.
//! `DropboxClient` holds no mutable state, so no locking is needed.

use std::time::Duration;

use anyhow::Result;

use dbxsync_core::domain::newtypes::Cursor;
use dbxsync_core::ports::remote_store::{IRemoteStore, ListFolderPage, LongPollResult, RemoteEntry};

use crate::client::DropboxClient;
use crate::{files, list_folder};

#[async_trait::async_trait]
impl IRemoteStore for DropboxClient {
    async fn list_folder(&self, path: &str, recursive: bool) -> Result<ListFolderPage> {
        list_folder::list_folder(self, path, recursive).await
    }

    async fn list_folder_continue(&self, cursor: &Cursor) -> Result<ListFolderPage> {
        list_folder::list_folder_continue(self, cursor).await
    }

    async fn longpoll(&self, cursor: &Cursor, timeout: Duration) -> Result<LongPollResult> {
        list_folder::longpoll(self, cursor, timeout).await
    }

    async fn get_metadata(&self, path: &str) -> Result<RemoteEntry> {
        files::get_metadata(self, path).await
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        files::download(self, path).await
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<RemoteEntry> {
        files::upload(self, path, data).await
    }

    async fn create_folder(&self, path: &str) -> Result<RemoteEntry> {
        files::create_folder(self, path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        files::delete(self, path).await
    }
}
