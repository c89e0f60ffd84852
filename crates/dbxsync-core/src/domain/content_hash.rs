//! Dropbox content hash
//!
//! The stream is split into 4 MiB blocks, each block is hashed with SHA-256,
//! the block digests are concatenated and the concatenation is hashed again.
//! The result is rendered as 64 lowercase hex characters and compares equal
//! to the `content_hash` Dropbox reports for the same bytes.
//!
//! A zero-length stream counts as one empty block, so it hashes to
//! `sha256(sha256(""))`.

use std::fmt::{self, Display, Formatter};
use std::io::{self, Read};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::DomainError;

/// Dropbox hashes content in blocks of this many bytes
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// A content hash, 64 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse a hex content hash as reported by the remote store
    ///
    /// # Errors
    /// Returns error if the value isn't 64 hex characters
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(format!(
                "expected 64 hex characters: {hash}"
            )));
        }
        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Hash an in-memory buffer
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Hash everything readable from `reader`
    ///
    /// # Errors
    /// Any read error aborts hashing; no partial hash is returned.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = ContentHasher::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(hasher.finalize())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// Incremental content hasher
///
/// Bytes may be fed in slices of any size; block boundaries are tracked
/// internally so the result never depends on how the input was chunked.
#[derive(Clone)]
pub struct ContentHasher {
    overall: Sha256,
    block: Sha256,
    block_len: usize,
    blocks_done: bool,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            overall: Sha256::new(),
            block: Sha256::new(),
            block_len: 0,
            blocks_done: false,
        }
    }

    /// Feed more bytes
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (BLOCK_SIZE - self.block_len).min(data.len());
            self.block.update(&data[..take]);
            self.block_len += take;
            data = &data[take..];

            if self.block_len == BLOCK_SIZE {
                self.finish_block();
            }
        }
    }

    /// Finish hashing and render the digest
    #[must_use]
    pub fn finalize(mut self) -> ContentHash {
        // A full block was already folded in by `update`; anything left over,
        // or the single empty block of an empty stream, is folded in here.
        if self.block_len > 0 || !self.blocks_done {
            self.finish_block();
        }
        ContentHash(hex::encode(self.overall.finalize()))
    }

    fn finish_block(&mut self) {
        let digest = std::mem::take(&mut self.block).finalize();
        self.overall.update(digest);
        self.block_len = 0;
        self.blocks_done = true;
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
