// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors surfaced by the authentication flow.

use std::time::Duration;

use crate::directory::DirectoryError;
use crate::storage::StorageError;
use crate::validation::UsernameError;
use crate::wallet::WalletError;

/// How a screen should react to an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Directory, storage or wallet failure. Show and allow retry.
    Service,
    /// Invalid or taken username. The user edits and resubmits.
    Validation,
    /// Lookup deadline exceeded. Retry by reconnecting.
    Timeout,
    /// Local session points at a record that no longer exists. Logout only.
    CorruptedState,
    /// Operation not valid in the current state.
    Flow,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Service | ErrorKind::Timeout)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    InvalidUsername(#[from] UsernameError),

    #[error("username is already taken: {0}")]
    UsernameTaken(String),

    #[error("user lookup timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("session references missing user {user_id}")]
    CorruptedSession { user_id: String },

    #[error("no logged-in session")]
    NotLoggedIn,

    #[error("wallet is not connected")]
    WalletNotConnected,

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Storage(_) | AuthError::Directory(_) | AuthError::Wallet(_) => {
                ErrorKind::Service
            }
            AuthError::InvalidUsername(_) | AuthError::UsernameTaken(_) => ErrorKind::Validation,
            AuthError::Timeout(_) => ErrorKind::Timeout,
            AuthError::CorruptedSession { .. } => ErrorKind::CorruptedState,
            AuthError::NotLoggedIn
            | AuthError::WalletNotConnected
            | AuthError::InvalidState { .. } => ErrorKind::Flow,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Storage(_) => "storage_error",
            AuthError::Directory(_) => "directory_error",
            AuthError::Wallet(_) => "wallet_error",
            AuthError::InvalidUsername(_) => "invalid_username",
            AuthError::UsernameTaken(_) => "username_taken",
            AuthError::Timeout(_) => "auth_timeout",
            AuthError::CorruptedSession { .. } => "corrupted_session",
            AuthError::NotLoggedIn => "not_logged_in",
            AuthError::WalletNotConnected => "wallet_not_connected",
            AuthError::InvalidState { .. } => "invalid_state",
        }
    }

    /// Text for the screen layer.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Storage(_) => {
                "Could not save your session on this device. Please try again.".to_string()
            }
            AuthError::Directory(_) | AuthError::Timeout(_) => {
                "An error occurred while verifying your account. Please try again.".to_string()
            }
            AuthError::Wallet(_) => "Could not open the wallet connection.".to_string(),
            AuthError::InvalidUsername(e) => e.to_string(),
            AuthError::UsernameTaken(_) => "This username is already in use".to_string(),
            AuthError::CorruptedSession { .. } => {
                "Your user information could not be loaded. Please log in again.".to_string()
            }
            AuthError::NotLoggedIn => "Please log in first.".to_string(),
            AuthError::WalletNotConnected => {
                "Wallet not connected. Please connect your wallet first.".to_string()
            }
            AuthError::InvalidState { .. } => "Please wait for the current step to finish.".to_string(),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
