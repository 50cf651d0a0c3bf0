// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Remote User Directory
//!
//! Typed access to the `users` collection of the remote document store.
//!
//! ## Document Layout
//!
//! ```text
//! users/{id}
//!   id             # UUID v4, same as the document id
//!   walletAddress  # lowercase
//!   username       # lowercase
//!   createdAt      # timestamp
//! ```
//!
//! Every call is a fresh round trip: no caching, no retries.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{UserRecord, UserUpdate, WalletAddress};

pub use firestore::FirestoreDirectory;
pub use memory::InMemoryDirectory;

/// Errors from the remote directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),

    #[error("user directory returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed user document: {0}")]
    Decode(String),

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    Conflict(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Remote store of [`UserRecord`]s.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Case-insensitive lookup by wallet address. First match wins.
    async fn find_by_wallet_address(
        &self,
        address: &WalletAddress,
    ) -> DirectoryResult<Option<UserRecord>>;

    /// Lookup by primary key.
    async fn find_by_id(&self, id: &str) -> DirectoryResult<Option<UserRecord>>;

    /// Insert a new user with a fresh id.
    ///
    /// The address is lowercased; the username is stored as given. Username
    /// uniqueness is not checked here.
    async fn create(
        &self,
        wallet_address: &WalletAddress,
        username: &str,
    ) -> DirectoryResult<UserRecord>;

    /// Case-insensitive username existence check.
    async fn is_username_taken(&self, username: &str) -> DirectoryResult<bool>;

    /// Merge `update` into an existing user.
    ///
    /// A new username must not be held by another user
    /// ([`DirectoryError::Conflict`]); backends that keep a claim per name
    /// move it from the old name to the new one.
    async fn update(&self, id: &str, update: &UserUpdate) -> DirectoryResult<()>;

    /// Create a user only if `username` is unclaimed. `Ok(None)` when taken.
    ///
    /// The default is check-then-create and can still race with a concurrent
    /// signup; backends with a conditional write override it.
    async fn create_unique(
        &self,
        wallet_address: &WalletAddress,
        username: &str,
    ) -> DirectoryResult<Option<UserRecord>> {
        if self.is_username_taken(username).await? {
            return Ok(None);
        }
        self.create(wallet_address, username).await.map(Some)
    }
}

/// Build a record for a brand-new user.
pub fn new_user_record(wallet_address: &WalletAddress, username: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4().to_string(),
        wallet_address: wallet_address.normalized(),
        username: username.to_string(),
        created_at: Utc::now(),
    }
}
