// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Integration tests for the Firestore directory using a wiremock server

use m2m_wallet_auth::config::FirestoreConfig;
use m2m_wallet_auth::directory::{DirectoryError, FirestoreDirectory, UserDirectory};
use m2m_wallet_auth::models::{UserUpdate, WalletAddress};

use serde_json::json;
use wiremock::{
    matchers::{body_string_contains, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";
const DB_DOCS: &str = "databases/(default)/documents";

fn directory(server: &MockServer) -> FirestoreDirectory {
    directory_at(&format!("{}/v1", server.uri()))
}

fn directory_at(base_url: &str) -> FirestoreDirectory {
    let config = FirestoreConfig::new("demo", "test-key").with_base_url(base_url);
    FirestoreDirectory::new(config).unwrap()
}

/// 404 body Firestore sends for an absent document.
fn document_not_found(collection: &str, id: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": {
            "code": 404,
            "status": "NOT_FOUND",
            "message": format!("Document \"projects/demo/{DB_DOCS}/{collection}/{id}\" not found.")
        }
    }))
}

fn rename_to(username: &str) -> UserUpdate {
    UserUpdate {
        username: Some(username.to_string()),
        ..UserUpdate::default()
    }
}

fn user_document(id: &str, wallet: &str, username: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/demo/databases/(default)/documents/users/{id}"),
        "fields": {
            "id": { "stringValue": id },
            "walletAddress": { "stringValue": wallet },
            "username": { "stringValue": username },
            "createdAt": { "timestampValue": "2025-06-01T12:00:00.000000Z" }
        }
    })
}

#[tokio::test]
async fn test_find_by_wallet_address_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("0xabc0000000000000000000000000000000000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "document": user_document("u-1", "0xabc0000000000000000000000000000000000001", "alice"),
            "readTime": "2025-06-01T12:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let user = dir
        .find_by_wallet_address(&WalletAddress::from("0xABC0000000000000000000000000000000000001"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.id, "u-1");
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_find_by_wallet_address_no_match() {
    let mock_server = MockServer::start().await;

    // An empty query still yields one row carrying only readTime
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "readTime": "2025-06-01T12:00:00Z" }])),
        )
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let user = dir
        .find_by_wallet_address(&WalletAddress::from("0xdef"))
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_find_by_id_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/missing")))
        .respond_with(document_not_found("users", "missing"))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    assert!(dir.find_by_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_id_wrong_database_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u-1")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "status": "NOT_FOUND",
                "message": "The database (default) does not exist for project demo"
            }
        })))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let err = dir.find_by_id("u-1").await.unwrap_err();
    match err {
        DirectoryError::Http { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("does not exist"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_find_by_id_bare_404_is_an_error() {
    let mock_server = MockServer::start().await;

    // No route at all, e.g. a wrong base URL
    let dir = directory(&mock_server);
    let err = dir.find_by_id("u-1").await.unwrap_err();
    assert!(matches!(err, DirectoryError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_find_by_id_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u-7")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user_document("u-7", "0xabc", "bob")),
        )
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let user = dir.find_by_id("u-7").await.unwrap().unwrap();
    assert_eq!(user.username, "bob");
    assert_eq!(user.wallet_address.as_str(), "0xabc");
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u-1")))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let err = dir.find_by_id("u-1").await.unwrap_err();
    match err {
        DirectoryError::Http { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("backend unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_user_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/users")))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("0xabc0000000000000000000000000000000000002"))
        .and(body_string_contains("trader1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let user = dir
        .create(&WalletAddress::from("0xABC0000000000000000000000000000000000002"), "trader1")
        .await
        .unwrap();

    assert_eq!(user.wallet_address.as_str(), "0xabc0000000000000000000000000000000000002");
    assert_eq!(user.username, "trader1");
    assert!(!user.id.is_empty());
}

#[tokio::test]
async fn test_is_username_taken() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(body_string_contains("\"trader1\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "document": user_document("u-1", "0xabc", "trader1") }
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(body_string_contains("\"fresh\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{}])))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    // Queried in lowercase
    assert!(dir.is_username_taken("Trader1").await.unwrap());
    assert!(!dir.is_username_taken("fresh").await.unwrap());
}

#[tokio::test]
async fn test_update_sends_field_mask() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u-1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user_document("u-1", "0xabc", "oldname")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/usernames")))
        .and(query_param("documentId", "newname"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/users/u-1")))
        .and(query_param("updateMask.fieldPaths", "username"))
        .and(query_param("currentDocument.exists", "true"))
        .and(body_string_contains("newname"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The old name becomes free again
    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS}/usernames/oldname")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    dir.update("u-1", &rename_to("newname")).await.unwrap();
}

#[tokio::test]
async fn test_update_to_claimed_username_conflicts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u-1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user_document("u-1", "0xabc", "alice")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/usernames")))
        .and(query_param("documentId", "bob"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let err = dir.update("u-1", &rename_to("bob")).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Conflict(name) if name == "bob"));
}

#[tokio::test]
async fn test_update_failure_releases_new_claim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/u-1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(user_document("u-1", "0xabc", "alice")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/usernames")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/users/u-1")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS}/usernames/carol")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS}/usernames/alice")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let err = dir.update("u-1", &rename_to("carol")).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_update_missing_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{DOCS}/users/gone")))
        .respond_with(document_not_found("users", "gone"))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let err = dir.update("gone", &rename_to("x_y")).await.unwrap_err();
    assert!(matches!(err, DirectoryError::NotFound(id) if id == "gone"));
}

#[tokio::test]
async fn test_update_address_of_deleted_user() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/users/gone")))
        .and(query_param("updateMask.fieldPaths", "walletAddress"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "status": "NOT_FOUND",
                "message": format!("No document to update: projects/demo/{DB_DOCS}/users/gone")
            }
        })))
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let update = UserUpdate {
        wallet_address: Some(WalletAddress::from("0xNEW")),
        ..UserUpdate::default()
    };
    let err = dir.update("gone", &update).await.unwrap_err();
    assert!(matches!(err, DirectoryError::NotFound(id) if id == "gone"));
}

#[tokio::test]
async fn test_create_unique_claim_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{}])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/usernames")))
        .and(query_param("documentId", "trader1"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&mock_server)
        .await;

    // The user document must never be written
    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let created = dir
        .create_unique(&WalletAddress::from("0xabc"), "trader1")
        .await
        .unwrap();
    assert!(created.is_none());
}

#[tokio::test]
async fn test_create_unique_releases_claim_on_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{}])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/usernames")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/users")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{DOCS}/usernames/trader1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = directory(&mock_server);
    let err = dir
        .create_unique(&WalletAddress::from("0xabc"), "trader1")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    // Reserve a free port, then close it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = directory_at(&format!("http://127.0.0.1:{port}/v1"));
    let err = dir.find_by_id("u-1").await.unwrap_err();
    assert!(matches!(err, DirectoryError::Unavailable(_)));
}
