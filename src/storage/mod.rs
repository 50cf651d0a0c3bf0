// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Storage Module
//!
//! Device-local persistence for the login session.
//!
//! ## Layers
//!
//! - [`KeyValueStore`]: string get/set/remove, the seam to the host's
//!   persistence layer
//! - [`SessionStore`]: the three-key session record on top of it
//! - [`FileStorage`]: atomic JSON file I/O backing [`FileKeyValueStore`]
//!
//! ## Storage Layout (file backend)
//!
//! ```text
//! <data_dir>/
//!   kv/
//!     user_id.json
//!     wallet_address.json
//!     is_logged_in.json
//! ```

pub mod file_storage;
pub mod kv;
pub mod paths;
pub mod session;

pub use file_storage::{FileStorage, StorageError, StorageResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use paths::StoragePaths;
pub use session::SessionStore;
