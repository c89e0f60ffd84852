//! Files and change actions produced by the scanners
//!
//! A scanner turns every observed change into an [`Action`]: a Create or
//! Delete paired with the file it concerns. Remote actions carry a
//! [`RemoteFile`], local actions a [`LocalFile`]. Actions are built once per
//! observed event, consumed once by the synchronizer and then dropped.

use std::fmt;
use std::path::PathBuf;

use super::content_hash::ContentHash;
use super::newtypes::RelativePath;

/// Whether an entry is a regular file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    File,
    Folder,
}

impl FileKind {
    /// Kind of the entry at `path`; anything that can't be stat-ed counts as a file
    pub fn of_path(path: &std::path::Path) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => FileKind::Folder,
            _ => FileKind::File,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Folder => write!(f, "folder"),
        }
    }
}

/// A remote entry as seen in a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Dropbox identifier, empty for deleted entries
    pub id: String,
    /// Remote content hash; `None` for folders and deleted entries
    pub content_hash: Option<ContentHash>,
    /// Display name (last path segment)
    pub name: String,
    /// Path relative to the synchronized remote root
    pub relative_path: RelativePath,
    /// Absolute Dropbox path
    pub remote_path: String,
    pub kind: FileKind,
}

/// A local entry as seen by the filesystem watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute local path
    pub path: PathBuf,
    /// Path relative to the synchronized local root
    pub relative_path: RelativePath,
    pub kind: FileKind,
}

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "create"),
            ActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// A change event paired with the file it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action<F> {
    pub kind: ActionKind,
    pub file: F,
}

impl<F> Action<F> {
    pub fn create(file: F) -> Self {
        Self {
            kind: ActionKind::Create,
            file,
        }
    }

    pub fn delete(file: F) -> Self {
        Self {
            kind: ActionKind::Delete,
            file,
        }
    }
}

/// An action observed on the remote side
pub type RemoteAction = Action<RemoteFile>;

/// An action observed on the local side
pub type LocalAction = Action<LocalFile>;
