//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the values that cross the boundary between
//! the local tree and the remote store. Each newtype ensures data validity
//! at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RelativePath
// ============================================================================

/// A path relative to a synchronized root, the join key between both sides.
///
/// Always `/`-separated. The root itself is the empty string and every other
/// path starts with `/`, e.g. `"/notes/todo.txt"`. Joining it onto a remote
/// root gives the Dropbox path; joining it onto a local root gives the local
/// filesystem path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new RelativePath
    ///
    /// # Errors
    /// Returns error if the path is non-empty and doesn't start with `/`,
    /// or if it contains `.`/`..` segments or empty segments.
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Ok(Self(path));
        }

        if !path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "Relative path must be empty or start with '/': {path}"
            )));
        }

        if path[1..]
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(DomainError::InvalidPath(format!(
                "Relative path contains an invalid segment: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// The synchronized root itself
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Derive the relative path of a remote entry by stripping the remote root.
    ///
    /// Dropbox paths are case-insensitive, so the prefix comparison is too.
    /// A path outside the root is kept whole.
    pub fn from_remote(remote_root: &str, remote_path: &str) -> Result<Self, DomainError> {
        let stripped = match remote_path.get(..remote_root.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(remote_root) => {
                let rest = &remote_path[remote_root.len()..];
                if rest.is_empty() || rest.starts_with('/') {
                    rest
                } else {
                    remote_path
                }
            }
            _ => remote_path,
        };
        Self::new(stripped.to_string())
    }

    /// Derive the relative path of a local filesystem path under `local_root`.
    ///
    /// # Errors
    /// Returns [`DomainError::PathNotInSyncRoot`] if `path` is outside the root,
    /// or [`DomainError::InvalidPath`] for non-UTF-8 or non-normal components.
    pub fn from_local(local_root: &Path, path: &Path) -> Result<Self, DomainError> {
        let rest = path
            .strip_prefix(local_root)
            .map_err(|_| DomainError::PathNotInSyncRoot(path.display().to_string()))?;

        let mut relative = String::new();
        for component in rest.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        DomainError::InvalidPath(format!(
                            "Path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    relative.push('/');
                    relative.push_str(part);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "Unexpected path component in {}",
                        path.display()
                    )))
                }
            }
        }

        Self::new(relative)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the synchronized root itself
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve against a local root directory
    #[must_use]
    pub fn to_local(&self, local_root: &Path) -> PathBuf {
        if self.is_root() {
            return local_root.to_path_buf();
        }
        local_root.join(self.0.trim_start_matches('/'))
    }

    /// Resolve against a remote root (`""` or `/`-prefixed, no trailing slash)
    #[must_use]
    pub fn to_remote(&self, remote_root: &str) -> String {
        format!("{}{}", remote_root.trim_end_matches('/'), self.0)
    }

    /// Get the final path segment
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Dropbox list_folder cursor (opaque string)
///
/// Represents "everything listed so far" for one root. The token is opaque,
/// we only check that it's non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(String);

impl Cursor {
    /// Create a new Cursor
    ///
    /// # Errors
    /// Returns error if the cursor is empty
    pub fn new(cursor: String) -> Result<Self, DomainError> {
        if cursor.is_empty() {
            return Err(DomainError::InvalidCursor(
                "Cursor cannot be empty".to_string(),
            ));
        }
        Ok(Self(cursor))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Cursor {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}
