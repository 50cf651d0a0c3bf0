// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! String key-value persistence.
//!
//! [`KeyValueStore`] is the seam to the device's persistence layer. Two
//! implementations ship with the crate: an in-memory map and a file-backed
//! store writing one JSON document per key.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{FileStorage, StorageError, StoragePaths, StorageResult};

/// Device-local string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove several keys, stopping at the first failure.
    async fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// On-disk representation of a single entry.
#[derive(Debug, Serialize, Deserialize)]
struct KvEntry {
    value: String,
}

/// Store writing `<data_dir>/kv/<key>.json` per entry.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    storage: FileStorage,
}

impl FileKeyValueStore {
    /// Open the store under `paths`, creating directories as needed.
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        Ok(Self {
            storage: FileStorage::open(paths)?,
        })
    }

    fn entry_path(&self, key: &str) -> StorageResult<std::path::PathBuf> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.storage.paths().kv_entry(key))
    }
}

/// Keys become file names, so only `[A-Za-z0-9_-]` is accepted.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.entry_path(key)?;
        let entry: Option<KvEntry> = self.storage.read_json(path)?;
        Ok(entry.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.entry_path(key)?;
        self.storage.write_json(
            path,
            &KvEntry {
                value: value.to_string(),
            },
        )
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.entry_path(key)?;
        self.storage.delete(path)
    }
}
