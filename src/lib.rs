// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! M2M Wallet Auth - wallet-based login core
//!
//! This crate implements the login flow of the M2M mobile client: connect a
//! wallet, find or create the matching user in the remote directory, and
//! keep a device-local session.
//!
//! ## Modules
//!
//! - `auth` - Authentication state machine and routing
//! - `config` - Environment configuration and chain constants
//! - `directory` - Remote user directory (Firestore, in-memory)
//! - `error` - Flow-level errors
//! - `logging` - Tracing subscriber setup
//! - `models` - Shared records
//! - `storage` - Local key-value and session storage
//! - `validation` - Username rules
//! - `wallet` - Wallet-connection adapter and SDK bootstrap

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod validation;
pub mod wallet;

pub use auth::{AuthOrchestrator, AuthState, Route};
pub use error::{AuthError, AuthResult, ErrorKind};
