// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Wallet-based login for the M2M client.
//!
//! ## Auth Flow
//!
//! 1. Screen mounts and calls [`AuthOrchestrator::mount`]
//! 2. A stored logged-in session routes straight to the profile
//! 3. Otherwise the flow waits for the wallet to report a connected address
//! 4. The address is looked up in the user directory (10 s deadline):
//!    - found → session saved → profile
//!    - not found → username setup → account created → session saved → profile
//! 5. Logout clears the session, then disconnects the wallet
//!
//! Screens follow [`AuthState::route`] and react to errors by
//! [`crate::error::ErrorKind`].

pub mod deadline;
pub mod orchestrator;
pub mod state;

pub use deadline::{Deadline, DeadlineError};
pub use orchestrator::{AuthFailure, AuthOrchestrator, UsernameStatus};
pub use state::{AuthState, Route};
