//! Shared test helpers for Dropbox API integration tests
//!
//! Every helper mounts one endpoint on a wiremock server. The client returned
//! by [`setup_dropbox_mock`] sends API, content and notify requests to the
//! same server.

use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dbxsync_dropbox::client::DropboxClient;

pub const TOKEN: &str = "test-access-token";

/// Starts a mock server and a client pointing at it
pub async fn setup_dropbox_mock() -> (MockServer, DropboxClient) {
    let server = MockServer::start().await;
    let client = DropboxClient::with_base_url(TOKEN, server.uri());
    (server, client)
}

/// A listing entry for a file with the given content hash
pub fn file_entry(path_display: &str, content_hash: &str) -> Value {
    json!({
        ".tag": "file",
        "id": format!("id:{path_display}"),
        "name": path_display.rsplit('/').next().unwrap_or_default(),
        "path_display": path_display,
        "path_lower": path_display.to_lowercase(),
        "content_hash": content_hash,
    })
}

/// A listing entry for a folder
pub fn folder_entry(path_display: &str) -> Value {
    json!({
        ".tag": "folder",
        "id": format!("id:{path_display}"),
        "name": path_display.rsplit('/').next().unwrap_or_default(),
        "path_display": path_display,
        "path_lower": path_display.to_lowercase(),
    })
}

/// Mounts `/2/files/list_folder` answering once with one page
pub async fn mount_list_folder(
    server: &MockServer,
    root: &str,
    entries: Value,
    cursor: &str,
    has_more: bool,
) {
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_json(json!({
            "path": root,
            "recursive": true,
            "include_media_info": false,
            "include_deleted": false,
            "include_mounted_folders": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": entries,
            "cursor": cursor,
            "has_more": has_more
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// Mounts `/2/files/list_folder/continue` for one specific cursor
pub async fn mount_list_folder_continue(
    server: &MockServer,
    cursor: &str,
    entries: Value,
    next_cursor: &str,
    has_more: bool,
) {
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_json(json!({ "cursor": cursor })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": entries,
            "cursor": next_cursor,
            "has_more": has_more
        })))
        .mount(server)
        .await;
}

/// Mounts `/2/files/get_metadata` answering with `metadata` for `remote_path`
pub async fn mount_metadata(server: &MockServer, remote_path: &str, metadata: Value) {
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(body_json(json!({ "path": remote_path, "include_deleted": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata))
        .mount(server)
        .await;
}

/// Mounts `/2/files/get_metadata` answering 409 `path/not_found`
pub async fn mount_metadata_not_found(server: &MockServer, remote_path: &str) {
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(body_json(json!({ "path": remote_path, "include_deleted": false })))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/not_found/..",
            "error": { ".tag": "path", "path": { ".tag": "not_found" } }
        })))
        .mount(server)
        .await;
}
