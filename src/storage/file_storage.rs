// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device-local file storage.
//!
//! Plain filesystem I/O under the configured data directory. JSON writes go
//! through a temp file and a rename so a crash never leaves a half-written
//! entry behind.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for local storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Key cannot be used as a storage entry name
    InvalidKey(String),
    /// Backend could not be reached (host-provided stores)
    Unavailable(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::InvalidKey(key) => write!(f, "Invalid storage key: {key:?}"),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// File-backed storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    paths: StoragePaths,
}

impl FileStorage {
    /// Open storage under `paths`, creating the directory structure.
    /// Safe to call on an existing data directory.
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        fs::create_dir_all(paths.kv_dir())?;
        Ok(Self { paths })
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Read a JSON file, returning `None` if it does not exist.
    pub fn read_json<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
    ) -> StorageResult<Option<T>> {
        let file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(value))
    }

    /// Write a JSON file (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Delete a file. Missing files are not an error.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        match fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    fn test_storage() -> (tempfile::TempDir, FileStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage =
            FileStorage::open(StoragePaths::new(dir.path())).expect("Failed to open test storage");
        (dir, storage)
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: String,
        value: i32,
    }

    #[test]
    fn open_creates_kv_directory() {
        let (_dir, storage) = test_storage();
        assert!(storage.paths().kv_dir().exists());
    }

    #[test]
    fn write_and_read_json() {
        let (_dir, storage) = test_storage();
        let data = TestData {
            id: "test-1".to_string(),
            value: 42,
        };

        let path = storage.paths().kv_dir().join("test.json");
        storage.write_json(&path, &data).unwrap();

        let read: Option<TestData> = storage.read_json(&path).unwrap();
        assert_eq!(read, Some(data));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn read_missing_file_is_none() {
        let (_dir, storage) = test_storage();
        let read: Option<TestData> = storage
            .read_json(storage.paths().kv_dir().join("missing.json"))
            .unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn corrupt_json_is_an_error() {
        let (_dir, storage) = test_storage();
        let path = storage.paths().kv_dir().join("broken.json");
        fs::write(&path, b"{not json").unwrap();

        let result = storage.read_json::<TestData>(&path);
        assert!(matches!(result, Err(StorageError::Json(_))));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, storage) = test_storage();
        let path = storage.paths().kv_dir().join("to-delete.json");
        storage
            .write_json(&path, &TestData {
                id: "del".to_string(),
                value: 0,
            })
            .unwrap();

        assert!(path.exists());
        storage.delete(&path).unwrap();
        assert!(!path.exists());
        storage.delete(&path).unwrap();
    }

    #[test]
    fn open_is_idempotent_and_keeps_entries() {
        let (dir, storage) = test_storage();
        let path = storage.paths().kv_dir().join("kept.json");
        storage
            .write_json(&path, &TestData {
                id: "kept".to_string(),
                value: 7,
            })
            .unwrap();

        let reopened = FileStorage::open(StoragePaths::new(dir.path())).unwrap();
        let read: Option<TestData> = reopened.read_json(&path).unwrap();
        assert_eq!(read.map(|d| d.value), Some(7));
    }
}
