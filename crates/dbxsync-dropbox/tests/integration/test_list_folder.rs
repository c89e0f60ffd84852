//! Integration tests for folder listing and long-poll
//!
//! - First page of a recursive listing
//! - Continuation with the stored cursor
//! - Long-poll on the notify host without credentials
//! - Error statuses surface with the server payload

use std::time::Duration;

use dbxsync_core::domain::newtypes::Cursor;
use dbxsync_core::ports::remote_store::EntryTag;
use dbxsync_dropbox::list_folder;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_list_folder_first_page() {
    let (server, client) = common::setup_dropbox_mock().await;

    let hash = "b".repeat(64);
    common::mount_list_folder(
        &server,
        "/Notes",
        json!([
            common::folder_entry("/Notes/sub"),
            common::file_entry("/Notes/sub/a.txt", &hash),
        ]),
        "cursor-1",
        true,
    )
    .await;

    let page = list_folder::list_folder(&client, "/Notes", true)
        .await
        .expect("list_folder failed");

    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].tag, EntryTag::Folder);
    assert_eq!(page.entries[0].path_display, "/Notes/sub");
    assert_eq!(page.entries[1].tag, EntryTag::File);
    assert_eq!(page.entries[1].content_hash.as_ref().unwrap().as_str(), hash);
    assert_eq!(page.cursor.as_str(), "cursor-1");
    assert!(page.has_more);
}

#[tokio::test]
async fn test_list_folder_sends_bearer_token() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [],
            "cursor": "c",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = list_folder::list_folder(&client, "", true).await.unwrap();
    assert!(page.entries.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_list_folder_continue_uses_cursor() {
    let (server, client) = common::setup_dropbox_mock().await;

    common::mount_list_folder_continue(
        &server,
        "cursor-1",
        json!([{ ".tag": "deleted", "name": "report.pdf", "path_display": "/report.pdf" }]),
        "cursor-2",
        false,
    )
    .await;

    let cursor = Cursor::new("cursor-1".to_string()).unwrap();
    let page = list_folder::list_folder_continue(&client, &cursor)
        .await
        .expect("continue failed");

    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].tag, EntryTag::Deleted);
    assert_eq!(page.cursor.as_str(), "cursor-2");
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_list_folder_api_error_includes_body() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_string(r#"{"error_summary": "path/not_found/.."}"#),
        )
        .mount(&server)
        .await;

    let err = list_folder::list_folder(&client, "/missing", true)
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("can't fetch folder page /missing"), "{msg}");
    assert!(msg.contains("409"), "{msg}");
    assert!(msg.contains("path/not_found"), "{msg}");
}

#[tokio::test]
async fn test_list_folder_malformed_body_is_decode_error() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = list_folder::list_folder(&client, "/x", true).await.unwrap_err();
    assert!(format!("{err:#}").contains("Invalid response"));
}

#[tokio::test]
async fn test_longpoll_reports_changes_without_credentials() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/longpoll"))
        .and(body_json(json!({ "cursor": "cursor-9", "timeout": 30 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "changes": true })))
        .expect(1)
        .mount(&server)
        .await;

    let cursor = Cursor::new("cursor-9".to_string()).unwrap();
    let result = list_folder::longpoll(&client, &cursor, Duration::from_secs(30))
        .await
        .expect("longpoll failed");

    assert!(result.changes);
    assert_eq!(result.backoff, None);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_longpoll_backoff() {
    let (server, client) = common::setup_dropbox_mock().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/longpoll"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "changes": false, "backoff": 60 })),
        )
        .mount(&server)
        .await;

    let cursor = Cursor::new("c".to_string()).unwrap();
    let result = list_folder::longpoll(&client, &cursor, Duration::from_secs(30))
        .await
        .unwrap();

    assert!(!result.changes);
    assert_eq!(result.backoff, Some(Duration::from_secs(60)));
}
