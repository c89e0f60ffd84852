//! File operations for the Dropbox API
//!
//! - [`get_metadata`] - Existence and content hash lookup for one path
//! - [`download`] - Fetches a file's bytes
//! - [`upload`] - Single-request upload in `add` mode, never renaming
//! - [`create_folder`] - Creates a folder, never renaming
//! - [`delete`] - Deletes a file or a folder tree
//!
//! ## Dropbox API References
//!
//! - [files/get_metadata](https://www.dropbox.com/developers/documentation/http/documentation#files-get_metadata)
//! - [files/upload](https://www.dropbox.com/developers/documentation/http/documentation#files-upload)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dbxsync_core::domain::content_hash::ContentHash;
use dbxsync_core::ports::remote_store::{EntryTag, RemoteEntry};

use crate::client::DropboxClient;
use crate::DropboxError;

const GET_METADATA: &str = "/2/files/get_metadata";
const DOWNLOAD: &str = "/2/files/download";
const UPLOAD: &str = "/2/files/upload";
const CREATE_FOLDER: &str = "/2/files/create_folder_v2";
const DELETE: &str = "/2/files/delete_v2";

// ============================================================================
// Dropbox API types
// ============================================================================

/// Metadata of a file, folder or deleted entry
///
/// Listing and get_metadata responses carry a `.tag`; upload and
/// create_folder answers describe a single known kind and omit it.
#[derive(Debug, Deserialize)]
pub(crate) struct DropboxMetadata {
    #[serde(rename = ".tag")]
    tag: Option<String>,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    path_display: Option<String>,
    path_lower: Option<String>,
    content_hash: Option<String>,
}

/// Wrapper used by the `_v2` endpoints
#[derive(Debug, Deserialize)]
struct MetadataResult {
    metadata: DropboxMetadata,
}

#[derive(Debug, Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct GetMetadataArg<'a> {
    path: &'a str,
    include_deleted: bool,
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

#[derive(Debug, Serialize)]
struct CreateFolderArg<'a> {
    path: &'a str,
    autorename: bool,
}

// ============================================================================
// EntryParser - converts Dropbox metadata to port-level types
// ============================================================================

/// Parser for converting Dropbox metadata into [`RemoteEntry`] values
pub(crate) struct EntryParser;

impl EntryParser {
    /// Parse one metadata object; `default_tag` applies when `.tag` is absent
    pub(crate) fn parse(
        endpoint: &str,
        metadata: DropboxMetadata,
        default_tag: EntryTag,
    ) -> Result<RemoteEntry, DropboxError> {
        let invalid = |message: String| DropboxError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message,
        };

        let tag = match metadata.tag.as_deref() {
            None => default_tag,
            Some("file") => EntryTag::File,
            Some("folder") => EntryTag::Folder,
            Some("deleted") => EntryTag::Deleted,
            Some(other) => return Err(invalid(format!("unknown entry tag '{other}'"))),
        };

        let path_display = metadata
            .path_display
            .or(metadata.path_lower)
            .ok_or_else(|| invalid(format!("entry '{}' has no path", metadata.name)))?;

        let content_hash = metadata
            .content_hash
            .map(ContentHash::new)
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(RemoteEntry {
            tag,
            id: metadata.id,
            name: metadata.name,
            path_display,
            content_hash,
        })
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Looks up the metadata of `path`
///
/// A missing path fails with an API error (`path/not_found`).
pub async fn get_metadata(client: &DropboxClient, path: &str) -> Result<RemoteEntry> {
    debug!(path, "Fetching metadata");
    let metadata: DropboxMetadata = client
        .rpc(
            GET_METADATA,
            &GetMetadataArg {
                path,
                include_deleted: false,
            },
        )
        .await
        .with_context(|| format!("can't fetch metadata for {path}"))?;

    EntryParser::parse(GET_METADATA, metadata, EntryTag::File)
        .with_context(|| format!("can't parse metadata for {path}"))
}

/// Downloads the contents of the file at `path`
pub async fn download(client: &DropboxClient, path: &str) -> Result<Vec<u8>> {
    let data = client
        .content_download(DOWNLOAD, &PathArg { path })
        .await
        .with_context(|| format!("can't download {path}"))?;

    info!(path, bytes = data.len(), "Downloaded file");
    Ok(data)
}

/// Uploads `data` to `path` in `add` mode without autorename
///
/// An existing file with different content is a conflict error.
pub async fn upload(client: &DropboxClient, path: &str, data: Vec<u8>) -> Result<RemoteEntry> {
    let size = data.len();
    let metadata: DropboxMetadata = client
        .content_upload(
            UPLOAD,
            &UploadArg {
                path,
                mode: "add",
                autorename: false,
                mute: false,
            },
            data,
        )
        .await
        .with_context(|| format!("can't upload {path}"))?;

    info!(path, bytes = size, "Uploaded file");
    EntryParser::parse(UPLOAD, metadata, EntryTag::File)
        .with_context(|| format!("can't parse upload result for {path}"))
}

/// Creates a folder at `path` without autorename
pub async fn create_folder(client: &DropboxClient, path: &str) -> Result<RemoteEntry> {
    let result: MetadataResult = client
        .rpc(
            CREATE_FOLDER,
            &CreateFolderArg {
                path,
                autorename: false,
            },
        )
        .await
        .with_context(|| format!("can't create folder {path}"))?;

    info!(path, "Created folder");
    EntryParser::parse(CREATE_FOLDER, result.metadata, EntryTag::Folder)
        .with_context(|| format!("can't parse create_folder result for {path}"))
}

/// Deletes the file or folder at `path`
pub async fn delete(client: &DropboxClient, path: &str) -> Result<()> {
    let _: serde_json::Value = client
        .rpc(DELETE, &PathArg { path })
        .await
        .with_context(|| format!("can't delete {path}"))?;

    info!(path, "Deleted remote path");
    Ok(())
}
