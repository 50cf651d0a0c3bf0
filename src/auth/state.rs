// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication flow states and screen routing.

use serde::Serialize;

use crate::models::{LocalSession, UserRecord, WalletAddress};

/// Where the orchestrator is in the login flow.
///
/// ```text
/// CheckingSession ─┬─ SessionFound ─────────────────────────────────────── LoggedIn
///                  └─ NoSession ─ AwaitingWallet ─ WalletConnected ─ Authenticating ─┐
///                                                                                  │
///    ┌─────────────────────────────────────────────────────────────────────────────┘
///    ├─ ExistingUser ──────────────────────────────────────────────────── LoggedIn
///    └─ NewUser ─ AwaitingUsername ─ AccountCreated ───────────────────── LoggedIn
///
/// LoggedIn ─ LoggingOut ─ NoSession
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    CheckingSession,
    SessionFound { session: LocalSession },
    NoSession,
    AwaitingWallet,
    WalletConnected { address: WalletAddress },
    Authenticating { address: WalletAddress, attempt: u64 },
    ExistingUser { user: UserRecord },
    NewUser { address: WalletAddress },
    AwaitingUsername { address: WalletAddress },
    AccountCreated { user: UserRecord },
    LoggedIn { session: LocalSession },
    LoggingOut,
}

impl AuthState {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::CheckingSession => "checking session",
            AuthState::SessionFound { .. } => "session found",
            AuthState::NoSession => "no session",
            AuthState::AwaitingWallet => "awaiting wallet",
            AuthState::WalletConnected { .. } => "wallet connected",
            AuthState::Authenticating { .. } => "authenticating",
            AuthState::ExistingUser { .. } => "existing user",
            AuthState::NewUser { .. } => "new user",
            AuthState::AwaitingUsername { .. } => "awaiting username",
            AuthState::AccountCreated { .. } => "account created",
            AuthState::LoggedIn { .. } => "logged in",
            AuthState::LoggingOut => "logging out",
        }
    }

    pub fn route(&self) -> Route {
        match self {
            AuthState::SessionFound { .. }
            | AuthState::AccountCreated { .. }
            | AuthState::LoggedIn { .. } => Route::Profile,
            AuthState::NewUser { .. } | AuthState::AwaitingUsername { .. } => Route::UsernameSetup,
            AuthState::CheckingSession
            | AuthState::NoSession
            | AuthState::AwaitingWallet
            | AuthState::WalletConnected { .. }
            | AuthState::Authenticating { .. }
            | AuthState::ExistingUser { .. }
            | AuthState::LoggingOut => Route::Login,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthState::LoggedIn { .. })
    }
}

/// Screen the host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    UsernameSetup,
    Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes() {
        let address = WalletAddress::from("0xabc");
        let session = LocalSession {
            user_id: "u".into(),
            wallet_address: address.clone(),
            is_logged_in: true,
        };

        assert_eq!(AuthState::CheckingSession.route(), Route::Login);
        assert_eq!(
            AuthState::Authenticating {
                address: address.clone(),
                attempt: 1
            }
            .route(),
            Route::Login
        );
        assert_eq!(
            AuthState::AwaitingUsername {
                address: address.clone()
            }
            .route(),
            Route::UsernameSetup
        );
        assert_eq!(AuthState::LoggedIn { session }.route(), Route::Profile);
        assert_eq!(AuthState::LoggingOut.route(), Route::Login);
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(AuthState::WalletConnected {
            address: WalletAddress::from("0xabc"),
        })
        .unwrap();
        assert_eq!(json["state"], "wallet_connected");
        assert_eq!(json["address"], "0xabc");
    }
}
