// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Firestore REST client for the user directory.
//!
//! ## Requests
//!
//! - `GET    {docs}/users/{id}` - lookup by id
//! - `POST   {docs}/users?documentId={id}` - create (fails with 409 if present)
//! - `POST   {docs}:runQuery` - equality query on `walletAddress` / `username`
//! - `PATCH  {docs}/users/{id}?updateMask...&currentDocument.exists=true` - merge
//! - `POST   {docs}/usernames?documentId={username}` - username claim
//!
//! `{docs}` is `{base_url}/projects/{project}/databases/(default)/documents`.
//! Every request carries the web API key as the `key` query parameter.
//!
//! Field values use Firestore's typed JSON encoding
//! (`{"stringValue": ...}`, `{"timestampValue": ...}`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::{new_user_record, DirectoryError, DirectoryResult, UserDirectory};
use crate::config::FirestoreConfig;
use crate::models::{UserRecord, UserUpdate, WalletAddress};

/// Collection holding user documents.
pub const USERS_COLLECTION: &str = "users";

/// Collection holding one claim document per taken username.
pub const USERNAMES_COLLECTION: &str = "usernames";

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A Firestore document as returned by the REST API.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Error payload: `{"error": {"code": 404, "status": "NOT_FOUND", "message": ...}}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryRow {
    #[serde(default)]
    document: Option<Document>,
}

/// User directory backed by Cloud Firestore.
#[derive(Clone)]
pub struct FirestoreDirectory {
    config: FirestoreConfig,
    client: reqwest::Client,
}

impl FirestoreDirectory {
    pub fn new(config: FirestoreConfig) -> DirectoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    /// URL for `{docs}` followed by `segments`, with the API key appended.
    fn document_url(&self, segments: &[&str], query: &[(&str, &str)]) -> DirectoryResult<Url> {
        let mut url = Url::parse(&self.documents_root())
            .map_err(|e| DirectoryError::Unavailable(format!("invalid Firestore URL: {e}")))?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| DirectoryError::Unavailable("Firestore URL cannot be a base".into()))?
                .extend(segments);
        }
        self.append_query(&mut url, query);
        Ok(url)
    }

    fn run_query_url(&self) -> DirectoryResult<Url> {
        let mut url = Url::parse(&format!("{}:runQuery", self.documents_root()))
            .map_err(|e| DirectoryError::Unavailable(format!("invalid Firestore URL: {e}")))?;
        self.append_query(&mut url, &[]);
        Ok(url)
    }

    fn append_query(&self, url: &mut Url, query: &[(&str, &str)]) {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("key", &self.config.api_key);
    }

    /// First user whose `field` equals `value`.
    async fn query_first(&self, field: &str, value: &str) -> DirectoryResult<Option<UserRecord>> {
        let body = equality_query(USERS_COLLECTION, field, value);
        let response = self
            .client
            .post(self.run_query_url()?)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let rows: Vec<RunQueryRow> = response
            .json()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;

        rows.into_iter()
            .find_map(|row| row.document)
            .map(|doc| decode_user(&doc))
            .transpose()
    }

    /// Write a claim document for `username`. `false` if it already exists.
    async fn claim_username(
        &self,
        username: &str,
        wallet_address: &WalletAddress,
    ) -> DirectoryResult<bool> {
        let url = self.document_url(&[USERNAMES_COLLECTION], &[("documentId", username)])?;
        let body = json!({
            "fields": {
                "walletAddress": { "stringValue": wallet_address.normalized().as_str() },
                "claimedAt": { "timestampValue": format_timestamp(&Utc::now()) },
            }
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::CONFLICT => Ok(false),
            _ => Err(http_error(response).await),
        }
    }

    async fn release_username(&self, username: &str) {
        let url = match self.document_url(&[USERNAMES_COLLECTION, username], &[]) {
            Ok(url) => url,
            Err(e) => {
                warn!(username, error = %e, "Failed to build username claim URL");
                return;
            }
        };

        match self.client.delete(url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(username, status = %response.status(), "Failed to release username claim");
            }
            Err(e) => warn!(username, error = %e, "Failed to release username claim"),
        }
    }

    /// Merge write guarded by `currentDocument.exists`.
    async fn patch_user(&self, id: &str, update: &UserUpdate) -> DirectoryResult<()> {
        let (body, field_paths) = encode_update(update);
        let mut query: Vec<(&str, &str)> = field_paths
            .iter()
            .map(|path| ("updateMask.fieldPaths", *path))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let url = self.document_url(&[USERS_COLLECTION, id], &query)?;
        let response = self
            .client
            .patch(url)
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => {
                info!(user_id = id, fields = ?field_paths, "User updated");
                Ok(())
            }
            reqwest::StatusCode::NOT_FOUND => {
                missing_document(response, &user_path(id)).await?;
                Err(DirectoryError::NotFound(id.to_string()))
            }
            _ => Err(http_error(response).await),
        }
    }
}

#[async_trait]
impl UserDirectory for FirestoreDirectory {
    async fn find_by_wallet_address(
        &self,
        address: &WalletAddress,
    ) -> DirectoryResult<Option<UserRecord>> {
        let normalized = address.normalized();
        debug!(wallet_address = %normalized, "Looking up user by wallet address");
        self.query_first("walletAddress", normalized.as_str()).await
    }

    async fn find_by_id(&self, id: &str) -> DirectoryResult<Option<UserRecord>> {
        let url = self.document_url(&[USERS_COLLECTION, id], &[])?;
        let response = self.client.get(url).send().await.map_err(unavailable)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return missing_document(response, &user_path(id)).await.map(|()| None);
        }
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let doc: Document = response
            .json()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;
        decode_user(&doc).map(Some)
    }

    async fn create(
        &self,
        wallet_address: &WalletAddress,
        username: &str,
    ) -> DirectoryResult<UserRecord> {
        let record = new_user_record(wallet_address, username);
        let url = self.document_url(&[USERS_COLLECTION], &[("documentId", &record.id)])?;

        let response = self
            .client
            .post(url)
            .json(&encode_user(&record))
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => {
                info!(user_id = %record.id, username = %record.username, "User created");
                Ok(record)
            }
            reqwest::StatusCode::CONFLICT => Err(DirectoryError::Conflict(record.id)),
            _ => Err(http_error(response).await),
        }
    }

    async fn is_username_taken(&self, username: &str) -> DirectoryResult<bool> {
        let found = self
            .query_first("username", &username.to_lowercase())
            .await?;
        Ok(found.is_some())
    }

    async fn update(&self, id: &str, update: &UserUpdate) -> DirectoryResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        // A new username needs its own claim; the old claim goes once the
        // write lands.
        let mut rename = None;
        if let Some(username) = &update.username {
            let current = self
                .find_by_id(id)
                .await?
                .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
            let old_key = current.username.to_lowercase();
            let new_key = username.to_lowercase();
            if old_key != new_key {
                let owner = update
                    .wallet_address
                    .as_ref()
                    .unwrap_or(&current.wallet_address);
                if !self.claim_username(&new_key, owner).await? {
                    return Err(DirectoryError::Conflict(new_key));
                }
                rename = Some((old_key, new_key));
            }
        }

        match self.patch_user(id, update).await {
            Ok(()) => {
                if let Some((old_key, _)) = &rename {
                    self.release_username(old_key).await;
                }
                Ok(())
            }
            Err(e) => {
                if let Some((_, new_key)) = &rename {
                    self.release_username(new_key).await;
                }
                Err(e)
            }
        }
    }

    async fn create_unique(
        &self,
        wallet_address: &WalletAddress,
        username: &str,
    ) -> DirectoryResult<Option<UserRecord>> {
        let username_key = username.to_lowercase();

        // Users created before claims existed only show up in the users query.
        if self.is_username_taken(&username_key).await? {
            return Ok(None);
        }
        if !self.claim_username(&username_key, wallet_address).await? {
            debug!(username = %username_key, "Username already claimed");
            return Ok(None);
        }

        match self.create(wallet_address, username).await {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                self.release_username(&username_key).await;
                Err(e)
            }
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn unavailable(e: reqwest::Error) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

async fn http_error(response: reqwest::Response) -> DirectoryError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    DirectoryError::Http { status, message }
}

/// Document path as it appears in error messages.
fn user_path(id: &str) -> String {
    format!("documents/{USERS_COLLECTION}/{id}")
}

/// `Ok(())` when a 404 reports `document_path` itself as missing.
///
/// A wrong project or database id also answers 404; that is an HTTP error,
/// not an absent user.
async fn missing_document(response: reqwest::Response, document_path: &str) -> DirectoryResult<()> {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    if is_missing_document(&message, document_path) {
        Ok(())
    } else {
        Err(DirectoryError::Http { status, message })
    }
}

fn is_missing_document(body: &str, document_path: &str) -> bool {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return false;
    };
    let error = envelope.error;
    if error.status != "NOT_FOUND" {
        return false;
    }
    // "users/u-1" must not match inside "users/u-10"
    error.message.match_indices(document_path).any(|(at, _)| {
        error.message[at + document_path.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '-' && c != '_')
    })
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `runQuery` body for `field == value` on `collection`, first result only.
fn equality_query(collection: &str, field: &str, value: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": { "stringValue": value },
                }
            },
            "limit": 1,
        }
    })
}

fn encode_user(record: &UserRecord) -> Value {
    json!({
        "fields": {
            "id": { "stringValue": record.id },
            "walletAddress": { "stringValue": record.wallet_address.as_str() },
            "username": { "stringValue": record.username },
            "createdAt": { "timestampValue": format_timestamp(&record.created_at) },
        }
    })
}

/// Body and update mask for a merge write.
fn encode_update(update: &UserUpdate) -> (Value, Vec<&'static str>) {
    let mut fields = Map::new();
    let mut paths = Vec::new();

    if let Some(address) = &update.wallet_address {
        fields.insert(
            "walletAddress".to_string(),
            json!({ "stringValue": address.normalized().as_str() }),
        );
        paths.push("walletAddress");
    }
    if let Some(username) = &update.username {
        fields.insert("username".to_string(), json!({ "stringValue": username }));
        paths.push("username");
    }

    (json!({ "fields": fields }), paths)
}

fn string_field(doc: &Document, field: &str) -> Option<String> {
    doc.fields
        .get(field)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

/// `createdAt` may be a native timestamp or an RFC 3339 string.
fn timestamp_field(doc: &Document, field: &str) -> DirectoryResult<DateTime<Utc>> {
    let value = doc
        .fields
        .get(field)
        .ok_or_else(|| DirectoryError::Decode(format!("missing field {field}")))?;

    let raw = value
        .get("timestampValue")
        .or_else(|| value.get("stringValue"))
        .and_then(Value::as_str)
        .ok_or_else(|| DirectoryError::Decode(format!("field {field} is not a timestamp")))?;

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DirectoryError::Decode(format!("field {field}: {e}")))
}

fn decode_user(doc: &Document) -> DirectoryResult<UserRecord> {
    let id = string_field(doc, "id")
        .or_else(|| doc.name.rsplit('/').next().map(str::to_string))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DirectoryError::Decode("document has no id".to_string()))?;

    let wallet_address = string_field(doc, "walletAddress")
        .ok_or_else(|| DirectoryError::Decode(format!("user {id} has no walletAddress")))?;
    let username = string_field(doc, "username")
        .ok_or_else(|| DirectoryError::Decode(format!("user {id} has no username")))?;
    let created_at = timestamp_field(doc, "createdAt")?;

    Ok(UserRecord {
        id,
        wallet_address: WalletAddress(wallet_address),
        username,
        created_at,
    })
}
