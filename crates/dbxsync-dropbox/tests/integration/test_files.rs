//! Integration tests for file operations
//!
//! Verifies metadata lookup, upload, download, folder creation and deletion
//! against a wiremock-based Dropbox API mock server, both through the
//! module functions and through the `IRemoteStore` port.

use dbxsync_core::domain::content_hash::ContentHash;
use dbxsync_core::ports::remote_store::{EntryTag, IRemoteStore};
use dbxsync_dropbox::{files, DropboxError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_get_metadata_returns_entry() {
    let (server, client) = common::setup_dropbox_mock().await;

    let hash = ContentHash::from_bytes(b"hello");
    common::mount_metadata(
        &server,
        "/Notes/hello.txt",
        common::file_entry("/Notes/hello.txt", hash.as_str()),
    )
    .await;

    let entry = files::get_metadata(&client, "/Notes/hello.txt")
        .await
        .expect("get_metadata failed");

    assert_eq!(entry.tag, EntryTag::File);
    assert_eq!(entry.name, "hello.txt");
    assert_eq!(entry.content_hash, Some(hash));
}

#[tokio::test]
async fn test_get_metadata_not_found() {
    let (server, client) = common::setup_dropbox_mock().await;
    common::mount_metadata_not_found(&server, "/nope").await;

    let err = files::get_metadata(&client, "/nope").await.unwrap_err();

    let api_error = err
        .downcast_ref::<DropboxError>()
        .expect("root cause should be a DropboxError");
    assert!(api_error.is_not_found());
    assert!(format!("{err:#}").contains("can't fetch metadata for /nope"));
}

// ============================================================================
// Upload / download
// ============================================================================

#[tokio::test]
async fn test_upload_sends_add_mode_without_autorename() {
    let (server, client) = common::setup_dropbox_mock().await;

    let hash = ContentHash::from_bytes(b"hi");
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "id:a",
            "name": "a.txt",
            "path_display": "/a.txt",
            "content_hash": hash.as_str(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = files::upload(&client, "/a.txt", b"hi".to_vec())
        .await
        .expect("upload failed");
    assert_eq!(entry.tag, EntryTag::File);
    assert_eq!(entry.content_hash, Some(hash));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let arg: serde_json::Value = serde_json::from_str(
        request.headers["dropbox-api-arg"].to_str().unwrap(),
    )
    .unwrap();
    assert_eq!(
        arg,
        json!({"path": "/a.txt", "mode": "add", "autorename": false, "mute": false})
    );
    assert_eq!(request.headers["content-type"], "application/octet-stream");
    assert_eq!(request.headers["authorization"], "Bearer test-access-token");
    assert_eq!(request.body, b"hi");
}

#[tokio::test]
async fn test_upload_conflict_is_an_error() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            r#"{"error_summary": "path/conflict/file/..", "error": {".tag": "path"}}"#,
        ))
        .mount(&server)
        .await;

    let err = files::upload(&client, "/a.txt", b"new".to_vec())
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("can't upload /a.txt"), "{msg}");
    assert!(msg.contains("path/conflict"), "{msg}");
}

#[tokio::test]
async fn test_upload_then_download_round_trip() {
    let (server, client) = common::setup_dropbox_mock().await;

    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 253) as u8).collect();
    let hash = ContentHash::from_bytes(&content);

    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "id:blob",
            "name": "blob.bin",
            "path_display": "/blob.bin",
            "content_hash": hash.as_str(),
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.clone())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let uploaded = files::upload(&client, "/blob.bin", content.clone())
        .await
        .unwrap();
    let downloaded = files::download(&client, "/blob.bin").await.unwrap();

    assert_eq!(downloaded, content);
    assert_eq!(uploaded.content_hash, Some(ContentHash::from_bytes(&downloaded)));
}

#[tokio::test]
async fn test_download_sends_path_in_api_arg() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
        .mount(&server)
        .await;

    let data = files::download(&client, "/Ünïcode.txt").await.unwrap();
    assert!(data.is_empty());

    let requests = server.received_requests().await.unwrap();
    let raw = requests[0].headers["dropbox-api-arg"].to_str().unwrap();
    assert!(raw.is_ascii());
    let arg: serde_json::Value = serde_json::from_str(raw).unwrap();
    assert_eq!(arg, json!({"path": "/Ünïcode.txt"}));
}

#[tokio::test]
async fn test_download_missing_file_is_an_error() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .respond_with(ResponseTemplate::new(409).set_body_string("path/not_found/"))
        .mount(&server)
        .await;

    let err = files::download(&client, "/gone.txt").await.unwrap_err();
    assert!(format!("{err:#}").contains("can't download /gone.txt"));
}

// ============================================================================
// Folders and deletion
// ============================================================================

#[tokio::test]
async fn test_create_folder() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/create_folder_v2"))
        .and(body_json(json!({ "path": "/notes", "autorename": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "id": "id:n", "name": "notes", "path_display": "/notes" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = files::create_folder(&client, "/notes").await.unwrap();
    assert_eq!(entry.tag, EntryTag::Folder);
    assert_eq!(entry.path_display, "/notes");
}

#[tokio::test]
async fn test_delete() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/delete_v2"))
        .and(body_json(json!({ "path": "/old.txt" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { ".tag": "file", "name": "old.txt", "path_display": "/old.txt" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    files::delete(&client, "/old.txt").await.expect("delete failed");
}

// ============================================================================
// IRemoteStore port
// ============================================================================

#[tokio::test]
async fn test_client_as_remote_store() {
    let (server, client) = common::setup_dropbox_mock().await;
    common::mount_metadata(&server, "/notes", common::folder_entry("/notes")).await;

    let store: &dyn IRemoteStore = &client;
    let entry = store.get_metadata("/notes").await.unwrap();
    assert_eq!(entry.tag, EntryTag::Folder);
    assert!(entry.content_hash.is_none());
}
