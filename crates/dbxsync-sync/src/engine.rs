//! Bidirectional synchronization engine
//!
//! The [`Synchronizer`] binds one local root to one remote root. It owns a
//! [`RemoteScanner`] and a [`LocalScanner`] and exposes two drain loops that
//! run independently of each other:
//!
//! 1. **Dropbox to local** ([`Synchronizer::sync_remote_to_local`]): folder
//!    entries are created, file entries downloaded, deleted entries removed
//! 2. **Local to Dropbox** ([`Synchronizer::sync_local_to_remote`]): new or
//!    written files are uploaded, folders created, removals deleted
//!
//! ## Echo handling
//!
//! Nothing suppresses the echo of a change applied by the opposite loop.
//! Both directions compare content hashes before transferring bytes, so an
//! echoed change ends with a metadata lookup or a local hash and no transfer.
//! For that to hold, downloads are written to a staging file beside the
//! local root and renamed into place, so the watcher only ever reports
//! complete files.
//!
//! ## Failure
//!
//! Nothing is retried. The first error stops the loop that hit it and is
//! returned to the caller; loops also stop when the shared shutdown token
//! is cancelled.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use dbxsync_core::domain::{
    ActionKind, ContentHash, FileKind, LocalAction, LocalFile, RemoteAction, RemoteFile,
};
use dbxsync_core::ports::remote_store::{EntryTag, IRemoteStore};

use crate::remote_scanner::RemoteScanner;
use crate::scanner::Scanner;
use crate::watcher::{LocalScanner, WatchSet};
use crate::SyncError;

#[cfg(unix)]
const DIR_MODE: u32 = 0o750;
#[cfg(unix)]
const FILE_MODE: u32 = 0o640;

/// Synchronizes one local folder with one Dropbox folder
pub struct Synchronizer {
    store: Arc<dyn IRemoteStore>,
    local_root: PathBuf,
    remote_root: String,
    remote_scanner: Mutex<RemoteScanner>,
    local_scanner: Mutex<LocalScanner>,
    watch_set: WatchSet,
}

impl Synchronizer {
    /// Creates the scanners for a root pair
    ///
    /// The local watch starts immediately; the remote listing starts with
    /// the first call to [`sync_remote_to_local`](Self::sync_remote_to_local).
    pub fn new(
        store: Arc<dyn IRemoteStore>,
        local_root: impl Into<PathBuf>,
        remote_root: impl Into<String>,
    ) -> Self {
        let local_root = local_root.into();
        let remote_root = remote_root.into();

        let local_scanner = LocalScanner::new(local_root.clone());
        let watch_set = local_scanner.watch_set();
        let remote_scanner = RemoteScanner::new(store.clone(), remote_root.clone());

        Self {
            store,
            local_root,
            remote_root,
            remote_scanner: Mutex::new(remote_scanner),
            local_scanner: Mutex::new(local_scanner),
            watch_set,
        }
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// Handle to the directories watched under the local root
    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// Directory downloads are staged in before being renamed into place
    ///
    /// The parent of the local root, so staging files are never watched.
    fn staging_dir(&self) -> &Path {
        match self.local_root.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
            Some(parent) => parent,
            None => &self.local_root,
        }
    }

    // ========================================================================
    // Drain loops
    // ========================================================================

    /// Applies remote changes locally until an error occurs or `shutdown` fires
    #[tracing::instrument(
        name = "sync",
        skip_all,
        fields(folder = %self.local_root.display(), direction = "dropbox-to-local")
    )]
    pub async fn sync_remote_to_local(&self, shutdown: &CancellationToken) -> Result<(), SyncError> {
        info!(remote = %self.remote_root, "Starting");
        let mut scanner = self.remote_scanner.lock().await;

        while let Some(action) = next_action(&mut *scanner, shutdown).await? {
            if let Err(e) = self.apply_remote_action(&action).await {
                error!(error = %e, "Stopping");
                return Err(e);
            }
        }

        info!("Stopped");
        Ok(())
    }

    /// Applies local changes remotely until an error occurs or `shutdown` fires
    #[tracing::instrument(
        name = "sync",
        skip_all,
        fields(folder = %self.local_root.display(), direction = "local-to-dropbox")
    )]
    pub async fn sync_local_to_remote(&self, shutdown: &CancellationToken) -> Result<(), SyncError> {
        info!(remote = %self.remote_root, "Starting");
        let mut scanner = self.local_scanner.lock().await;

        while let Some(action) = next_action(&mut *scanner, shutdown).await? {
            if let Err(e) = self.apply_local_action(&action).await {
                error!(error = %e, "Stopping");
                return Err(e);
            }
        }

        info!("Stopped");
        Ok(())
    }

    // ========================================================================
    // Remote -> local
    // ========================================================================

    pub(crate) async fn apply_remote_action(&self, action: &RemoteAction) -> Result<(), SyncError> {
        let file = &action.file;
        let local_path = file.relative_path.to_local(&self.local_root);

        match action.kind {
            ActionKind::Create => {
                self.materialize(file, &local_path).await?;
                self.watch_set.notify_creation(&file.relative_path)?;
            }
            ActionKind::Delete => {
                remove_local(&local_path).await?;
                self.watch_set.notify_deletion(&file.relative_path);
            }
        }
        Ok(())
    }

    /// Creates or downloads the local counterpart of a remote entry
    async fn materialize(&self, file: &RemoteFile, local_path: &Path) -> Result<(), SyncError> {
        if let Some(remote_hash) = &file.content_hash {
            if local_content_hash(local_path).await.as_ref() == Some(remote_hash) {
                debug!(path = %file.relative_path, "Local file already up to date");
                return Ok(());
            }
        }

        match file.kind {
            FileKind::Folder => {
                debug!(path = %file.relative_path, "Creating local folder");
                create_dir_all(local_path).await
            }
            FileKind::File => {
                let data = self
                    .store
                    .download(&file.remote_path)
                    .await
                    .map_err(|e| SyncError::remote("can't download", file.remote_path.as_str(), e))?;

                if let Some(parent) = local_path.parent() {
                    create_dir_all(parent).await?;
                }
                let size = data.len();
                write_file(self.staging_dir(), local_path, data).await?;
                info!(path = %file.relative_path, bytes = size, "Downloaded");
                Ok(())
            }
        }
    }

    // ========================================================================
    // Local -> remote
    // ========================================================================

    pub(crate) async fn apply_local_action(&self, action: &LocalAction) -> Result<(), SyncError> {
        let file = &action.file;
        if file.relative_path.is_root() {
            debug!(action = %action.kind, "Ignoring change to the local root itself");
            return Ok(());
        }
        let remote_path = file.relative_path.to_remote(&self.remote_root);

        match (action.kind, file.kind) {
            (ActionKind::Create, FileKind::Folder) => self.create_remote_folder(&remote_path).await,
            (ActionKind::Create, FileKind::File) => self.upload(file, &remote_path).await,
            (ActionKind::Delete, _) => self.delete_remote(&remote_path).await,
        }
    }

    /// Uploads a local file unless the remote already has identical content
    async fn upload(&self, file: &LocalFile, remote_path: &str) -> Result<(), SyncError> {
        let data = match tokio::fs::read(&file.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %file.relative_path, "File vanished before upload");
                return Ok(());
            }
            Err(e) => return Err(SyncError::io(&file.path, &e)),
        };
        let local_hash = ContentHash::from_bytes(&data);

        match self.store.get_metadata(remote_path).await {
            Ok(entry) if entry.content_hash.as_ref() == Some(&local_hash) => {
                debug!(path = %file.relative_path, "Remote file already up to date");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => debug!(path = remote_path, error = %e, "No remote metadata"),
        }

        let size = data.len();
        self.store
            .upload(remote_path, data)
            .await
            .map_err(|e| SyncError::remote("can't upload", remote_path, e))?;
        info!(path = %file.relative_path, bytes = size, "Uploaded");
        Ok(())
    }

    /// Creates a remote folder unless one already exists
    async fn create_remote_folder(&self, remote_path: &str) -> Result<(), SyncError> {
        if let Ok(entry) = self.store.get_metadata(remote_path).await {
            if entry.tag == EntryTag::Folder {
                debug!(path = remote_path, "Remote folder already exists");
                return Ok(());
            }
        }

        self.store
            .create_folder(remote_path)
            .await
            .map_err(|e| SyncError::remote("can't create folder", remote_path, e))?;
        info!(path = remote_path, "Created remote folder");
        Ok(())
    }

    /// Deletes a remote path; a path that can't be found is already deleted
    async fn delete_remote(&self, remote_path: &str) -> Result<(), SyncError> {
        if let Err(e) = self.store.get_metadata(remote_path).await {
            debug!(path = remote_path, error = %e, "Remote path already gone");
            return Ok(());
        }

        self.store
            .delete(remote_path)
            .await
            .map_err(|e| SyncError::remote("can't delete", remote_path, e))?;
        info!(path = remote_path, "Deleted remote path");
        Ok(())
    }
}

/// Advances `scanner` unless `shutdown` fires first
///
/// Returns `Ok(None)` on shutdown and the scanner's terminal error when it
/// stops.
async fn next_action<S>(
    scanner: &mut S,
    shutdown: &CancellationToken,
) -> Result<Option<S::Item>, SyncError>
where
    S: Scanner + ?Sized,
{
    let advanced = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return Ok(None),
        advanced = scanner.advance() => advanced,
    };

    if advanced {
        if let Some(item) = scanner.current() {
            return Ok(Some(item.clone()));
        }
    }
    Err(scanner.error().cloned().unwrap_or(SyncError::Exhausted))
}

// ============================================================================
// Local filesystem helpers
// ============================================================================

/// Content hash of the file at `path`, `None` if it can't be read
async fn local_content_hash(path: &Path) -> Option<ContentHash> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::open(&path).and_then(|f| ContentHash::from_reader(std::io::BufReader::new(f)))
    })
    .await
    .ok()?
    .ok()
}

async fn create_dir_all(path: &Path) -> Result<(), SyncError> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    builder.create(path).await.map_err(|e| SyncError::io(path, &e))
}

/// Writes `data` to a staging file in `staging_dir`, then renames it to `path`
///
/// The watcher never sees a partially written file: `path` appears (or is
/// replaced) in a single rename. `staging_dir` must be on the same
/// filesystem as `path`.
async fn write_file(staging_dir: &Path, path: &Path, data: Vec<u8>) -> Result<(), SyncError> {
    let staging_dir = staging_dir.to_path_buf();
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || stage_and_persist(&staging_dir, &target, &data))
        .await
        .map_err(|e| SyncError::Io {
            path: path.to_path_buf(),
            message: format!("write task failed: {e}"),
        })?
}

fn stage_and_persist(staging_dir: &Path, target: &Path, data: &[u8]) -> Result<(), SyncError> {
    let mut staged = tempfile::Builder::new()
        .prefix(".dbxsync-")
        .suffix(".part")
        .tempfile_in(staging_dir)
        .map_err(|e| SyncError::io(staging_dir, &e))?;

    staged
        .write_all(data)
        .and_then(|()| staged.as_file().sync_data())
        .map_err(|e| SyncError::io(staged.path(), &e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
            .map_err(|e| SyncError::io(staged.path(), &e))?;
    }

    staged
        .persist(target)
        .map_err(|e| SyncError::io(target, &e.error))?;
    Ok(())
}

/// Removes a file or a directory tree; a missing path is not an error
async fn remove_local(path: &Path) -> Result<(), SyncError> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SyncError::io(path, &e)),
    };

    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => {
            info!(path = %path.display(), "Removed local path");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::io(path, &e)),
    }
}
