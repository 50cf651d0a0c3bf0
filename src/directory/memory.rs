// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local user directory.
//!
//! Backs tests and hosts that run without a remote document store. All
//! state lives behind one lock, so `create_unique` is atomic here.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{new_user_record, DirectoryError, DirectoryResult, UserDirectory};
use crate::models::{UserRecord, UserUpdate, WalletAddress};

#[derive(Default)]
struct Users {
    by_id: HashMap<String, UserRecord>,
    /// Insertion order, so "first match" is deterministic.
    order: Vec<String>,
}

impl Users {
    fn iter(&self) -> impl Iterator<Item = &UserRecord> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    fn username_taken(&self, username: &str) -> bool {
        let wanted = username.to_lowercase();
        self.iter().any(|u| u.username.to_lowercase() == wanted)
    }

    fn insert(&mut self, record: UserRecord) {
        self.order.push(record.id.clone());
        self.by_id.insert(record.id.clone(), record);
    }
}

#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<Users>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record as-is (no normalization).
    pub async fn insert(&self, record: UserRecord) {
        self.users.write().await.insert(record);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All records in insertion order.
    pub async fn records(&self) -> Vec<UserRecord> {
        self.users.read().await.iter().cloned().collect()
    }

    /// Remove a record, e.g. to simulate a deletion on the server.
    pub async fn remove(&self, id: &str) -> Option<UserRecord> {
        let mut users = self.users.write().await;
        users.order.retain(|existing| existing != id);
        users.by_id.remove(id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_wallet_address(
        &self,
        address: &WalletAddress,
    ) -> DirectoryResult<Option<UserRecord>> {
        let wanted = address.normalized();
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.wallet_address == wanted)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> DirectoryResult<Option<UserRecord>> {
        Ok(self.users.read().await.by_id.get(id).cloned())
    }

    async fn create(
        &self,
        wallet_address: &WalletAddress,
        username: &str,
    ) -> DirectoryResult<UserRecord> {
        let record = new_user_record(wallet_address, username);
        self.users.write().await.insert(record.clone());
        Ok(record)
    }

    async fn is_username_taken(&self, username: &str) -> DirectoryResult<bool> {
        Ok(self.users.read().await.username_taken(username))
    }

    async fn update(&self, id: &str, update: &UserUpdate) -> DirectoryResult<()> {
        let mut users = self.users.write().await;
        if !users.by_id.contains_key(id) {
            return Err(DirectoryError::NotFound(id.to_string()));
        }
        if let Some(username) = &update.username {
            let wanted = username.to_lowercase();
            let held_by_other = users
                .iter()
                .any(|u| u.id != id && u.username.to_lowercase() == wanted);
            if held_by_other {
                return Err(DirectoryError::Conflict(wanted));
            }
        }
        if let Some(record) = users.by_id.get_mut(id) {
            update.apply_to(record);
        }
        Ok(())
    }

    async fn create_unique(
        &self,
        wallet_address: &WalletAddress,
        username: &str,
    ) -> DirectoryResult<Option<UserRecord>> {
        let mut users = self.users.write().await;
        if users.username_taken(username) {
            return Ok(None);
        }
        let record = new_user_record(wallet_address, username);
        users.insert(record.clone());
        Ok(Some(record))
    }
}
