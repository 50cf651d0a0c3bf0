// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Records shared by the session store, the user directory and the
//! orchestrator.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype wraps EVM-style addresses as reported by the
//! wallet-connection provider. Addresses are compared and stored in their
//! lowercase form; the provider may report checksummed (mixed-case) values.
//!
//! ## Model Categories
//!
//! - **Users**: [`UserRecord`] and the partial [`UserUpdate`]
//! - **Sessions**: [`LocalSession`], the device-local login record
//! - **Wallet**: [`WalletConnectionState`] and [`ConnectionChanged`] events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Wallet Address Type
// =============================================================================

/// EVM-compatible wallet address wrapper.
///
/// # Example
///
/// ```rust,ignore
/// let addr = WalletAddress::from("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12");
/// assert_eq!(addr.normalized().as_str(), "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Lowercase form used for storage and lookups.
    pub fn normalized(&self) -> WalletAddress {
        WalletAddress(self.0.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `0x1234...abcd` form for display.
    pub fn shortened(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 10 {
            return self.0.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// User Models
// =============================================================================

/// An application user as stored in the remote directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Generated UUID, primary key in the directory.
    pub id: String,
    /// Lowercase wallet address, fixed at creation.
    pub wallet_address: WalletAddress,
    /// Lowercase username.
    pub username: String,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
}

/// Mutable subset of a [`UserRecord`].
///
/// `id` and `created_at` are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.wallet_address.is_none() && self.username.is_none()
    }

    /// Merge the present fields into `record`.
    pub fn apply_to(&self, record: &mut UserRecord) {
        if let Some(address) = &self.wallet_address {
            record.wallet_address = address.normalized();
        }
        if let Some(username) = &self.username {
            record.username = username.clone();
        }
    }
}

// =============================================================================
// Session Models
// =============================================================================

/// Device-local record of who is logged in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalSession {
    pub user_id: String,
    pub wallet_address: WalletAddress,
    pub is_logged_in: bool,
}

impl LocalSession {
    /// A logged-in session for `record`.
    pub fn for_user(record: &UserRecord) -> Self {
        Self {
            user_id: record.id.clone(),
            wallet_address: record.wallet_address.clone(),
            is_logged_in: true,
        }
    }
}

// =============================================================================
// Wallet Models
// =============================================================================

/// Connection state as pushed by the wallet provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConnectionState {
    pub is_connected: bool,
    /// `None` while disconnected.
    pub address: Option<WalletAddress>,
    pub is_connecting: bool,
}

impl WalletConnectionState {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connecting() -> Self {
        Self {
            is_connecting: true,
            ..Self::default()
        }
    }

    pub fn connected(address: impl Into<WalletAddress>) -> Self {
        Self {
            is_connected: true,
            address: Some(address.into()),
            is_connecting: false,
        }
    }
}

/// Connection transition observed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionChanged {
    pub is_connected: bool,
    pub address: Option<WalletAddress>,
}

impl ConnectionChanged {
    /// The usable address, if the wallet is connected with a non-empty one.
    pub fn connected_address(&self) -> Option<&WalletAddress> {
        if !self.is_connected {
            return None;
        }
        self.address.as_ref().filter(|a| !a.is_empty())
    }
}

impl From<&WalletConnectionState> for ConnectionChanged {
    fn from(state: &WalletConnectionState) -> Self {
        Self {
            is_connected: state.is_connected,
            address: state.address.clone(),
        }
    }
}
