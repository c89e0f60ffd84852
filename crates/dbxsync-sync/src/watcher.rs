//! Filesystem watching for the local side of a synchronized pair
//!
//! [`LocalScanner`] wraps the `notify` crate and turns raw OS events under a
//! local root into [`LocalAction`] values. [`WatchSet`] is a cloneable handle
//! to the set of watched directories, shared with the synchronizer so that
//! folders it creates locally start being watched too.
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │  (watcher thread)
//!       ▼
//!  translate_event ──→ mpsc::channel<LocalAction> ──┐
//!  watcher errors  ──→ mpsc::channel<notify::Error> ─┴──→ LocalScanner::advance
//! ```
//!
//! Every directory is watched non-recursively. Directories that exist when
//! the scanner starts are enrolled once; later ones only through
//! [`WatchSet::notify_creation`]. Only a failure to watch the root itself
//! stops the scanner; a subdirectory that can't be listed or watched is
//! skipped with a warning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use dbxsync_core::domain::{FileKind, LocalAction, LocalFile, RelativePath};

use crate::scanner::Scanner;
use crate::SyncError;

/// Capacity of the event and error channels
const CHANNEL_CAPACITY: usize = 1024;

// ============================================================================
// WatchSet
// ============================================================================

struct WatchState {
    watcher: Option<RecommendedWatcher>,
    paths: HashSet<PathBuf>,
}

/// Shared handle to the directories watched under one local root
///
/// Cloning the handle shares the underlying watcher. Access is serialized
/// by a mutex.
#[derive(Clone)]
pub struct WatchSet {
    root: PathBuf,
    state: Arc<Mutex<WatchState>>,
}

impl WatchSet {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Arc::new(Mutex::new(WatchState {
                watcher: None,
                paths: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install(&self, watcher: RecommendedWatcher) {
        self.lock().watcher = Some(watcher);
    }

    /// Starts watching `dir` unless it is already watched
    fn add(&self, dir: &Path) -> Result<(), SyncError> {
        let mut state = self.lock();
        if state.paths.contains(dir) {
            return Ok(());
        }
        let Some(watcher) = state.watcher.as_mut() else {
            return Err(SyncError::Watch("watcher is not running".to_string()));
        };
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| SyncError::Watch(format!("can't watch {}: {e}", dir.display())))?;
        state.paths.insert(dir.to_path_buf());
        debug!(path = %dir.display(), "Watching directory");
        Ok(())
    }

    /// Watches the local counterpart of `relative` if it is a directory
    ///
    /// Called after a folder has been created locally on behalf of the
    /// remote side.
    pub fn notify_creation(&self, relative: &RelativePath) -> Result<(), SyncError> {
        let path = relative.to_local(&self.root);
        if path.is_dir() {
            self.add(&path)?;
        }
        Ok(())
    }

    /// Stops watching the local counterpart of `relative` and everything below it
    ///
    /// The directory is usually gone already, so unwatch failures are ignored.
    pub fn notify_deletion(&self, relative: &RelativePath) {
        let path = relative.to_local(&self.root);
        let mut state = self.lock();
        let removed: Vec<PathBuf> = state
            .paths
            .iter()
            .filter(|p| p.starts_with(&path))
            .cloned()
            .collect();

        for dir in removed {
            state.paths.remove(&dir);
            if let Some(watcher) = state.watcher.as_mut() {
                if let Err(e) = watcher.unwatch(&dir) {
                    debug!(path = %dir.display(), error = %e, "Unwatch failed");
                }
            }
            debug!(path = %dir.display(), "Stopped watching directory");
        }
    }

    /// Whether `dir` is currently watched
    pub fn contains(&self, dir: &Path) -> bool {
        self.lock().paths.contains(dir)
    }

    /// Number of watched directories
    pub fn len(&self) -> usize {
        self.lock().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// LocalScanner
// ============================================================================

/// Scanner over filesystem events under a local root
///
/// Construction never fails: if the watcher can't be started the scanner
/// begins in its error state and the first `advance` reports it.
pub struct LocalScanner {
    root: PathBuf,
    watch_set: WatchSet,
    actions: mpsc::Receiver<LocalAction>,
    errors: mpsc::Receiver<notify::Error>,
    current: Option<LocalAction>,
    error: Option<SyncError>,
}

impl LocalScanner {
    /// Starts watching `root` and every directory already below it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let (action_tx, actions) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, errors) = mpsc::channel(CHANNEL_CAPACITY);

        let mut scanner = Self {
            watch_set: WatchSet::new(root.clone()),
            root,
            actions,
            errors,
            current: None,
            error: None,
        };

        match scanner.start(action_tx, error_tx) {
            Ok(()) => info!(
                path = %scanner.root.display(),
                directories = scanner.watch_set.len(),
                "Watching local folder"
            ),
            Err(e) => {
                error!(path = %scanner.root.display(), error = %e, "Local scanner failed to start");
                scanner.error = Some(e);
            }
        }
        scanner
    }

    fn start(
        &self,
        action_tx: mpsc::Sender<LocalAction>,
        error_tx: mpsc::Sender<notify::Error>,
    ) -> Result<(), SyncError> {
        let root = self.root.clone();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for action in translate_event(&root, &event) {
                        if action_tx.blocking_send(action).is_err() {
                            debug!("Local scanner dropped, discarding event");
                            return;
                        }
                    }
                }
                Err(err) => {
                    if error_tx.blocking_send(err).is_err() {
                        debug!("Local scanner dropped, discarding watcher error");
                    }
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| SyncError::Watch(format!("can't create watcher: {e}")))?;

        self.watch_set.install(watcher);
        self.watch_set.add(&self.root)?;
        enroll(&self.watch_set, subdirectories(&self.root));
        Ok(())
    }

    /// Handle to this scanner's watched directories
    pub fn watch_set(&self) -> WatchSet {
        self.watch_set.clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Scanner for LocalScanner {
    type Item = LocalAction;

    async fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }

        let next = tokio::select! {
            biased;
            action = self.actions.recv() => {
                action.ok_or_else(|| SyncError::Watch("event stream closed".to_string()))
            }
            err = self.errors.recv() => Err(match err {
                Some(e) => SyncError::Watch(e.to_string()),
                None => SyncError::Watch("error stream closed".to_string()),
            }),
        };

        match next {
            Ok(action) => {
                debug!(action = %action.kind, path = %action.file.relative_path, "Local change");
                self.current = Some(action);
                true
            }
            Err(e) => {
                error!(error = %e, "Local scanner stopped");
                self.current = None;
                self.error = Some(e);
                false
            }
        }
    }

    fn current(&self) -> Option<&LocalAction> {
        self.current.as_ref()
    }

    fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }
}

// ============================================================================
// Start-up enrollment
// ============================================================================

/// Every directory below `root` that can be listed
///
/// Symlinked directories are not followed. Unreadable directories are
/// logged and skipped along with everything below them.
fn subdirectories(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Can't list directory, skipping");
                continue;
            }
        };
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                found.push(entry.path());
                pending.push(entry.path());
            }
        }
    }
    found
}

/// Watches each of `dirs`, skipping the ones that can't be watched
///
/// Returns how many were enrolled.
fn enroll(watch_set: &WatchSet, dirs: impl IntoIterator<Item = PathBuf>) -> usize {
    let mut enrolled = 0;
    for dir in dirs {
        match watch_set.add(&dir) {
            Ok(()) => enrolled += 1,
            Err(e) => warn!(path = %dir.display(), error = %e, "Not watching directory"),
        }
    }
    enrolled
}

// ============================================================================
// Event translation
// ============================================================================

/// Converts a `notify::Event` into local actions
///
/// - `Create(*)`, `Modify(Data|Any|Other)`, `Modify(Name(To))` -> Create
/// - `Remove(*)`, `Modify(Name(From))` -> Delete
/// - `Modify(Name(Both))` with two paths -> Delete(old), Create(new)
/// - `Modify(Name(Any|Other))` -> Create if the path exists, else Delete
/// - Access, metadata and other events are ignored
fn translate_event(root: &Path, event: &notify::Event) -> Vec<LocalAction> {
    let paths = &event.paths;

    let actions = match &event.kind {
        EventKind::Create(_)
        | EventKind::Modify(
            ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other | ModifyKind::Name(RenameMode::To),
        ) => paths.iter().filter_map(|p| local_action(root, p, true)).collect(),

        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.iter().filter_map(|p| local_action(root, p, false)).collect()
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            [local_action(root, &paths[0], false), local_action(root, &paths[1], true)]
                .into_iter()
                .flatten()
                .collect()
        }

        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .filter_map(|p| local_action(root, p, p.exists()))
            .collect(),

        _ => Vec::new(),
    };

    if actions.is_empty() {
        debug!(kind = ?event.kind, "Ignoring event");
    }
    actions
}

fn local_action(root: &Path, path: &Path, created: bool) -> Option<LocalAction> {
    let relative_path = match RelativePath::from_local(root, path) {
        Ok(relative) => relative,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping event outside the synchronized tree");
            return None;
        }
    };

    let file = LocalFile {
        path: path.to_path_buf(),
        relative_path,
        kind: FileKind::of_path(path),
    };
    Some(if created {
        LocalAction::create(file)
    } else {
        LocalAction::delete(file)
    })
}
