// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local session persistence.
//!
//! ## Storage Layout
//!
//! Three string keys in the device key-value store:
//! ```text
//! user_id         # UserRecord id
//! wallet_address  # address at login time
//! is_logged_in    # "true" | "false"
//! ```
//!
//! The keys are written one after another. If a write fails midway the
//! store is left partially written; `load` then reports no session as soon
//! as any key is missing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{KeyValueStore, StorageResult};
use crate::models::{LocalSession, WalletAddress};

/// Key holding the logged-in user's id.
pub const USER_ID_KEY: &str = "user_id";

/// Key holding the wallet address the session was created with.
pub const WALLET_ADDRESS_KEY: &str = "wallet_address";

/// Key holding the logged-in flag.
pub const IS_LOGGED_IN_KEY: &str = "is_logged_in";

const SESSION_KEYS: [&str; 3] = [USER_ID_KEY, WALLET_ADDRESS_KEY, IS_LOGGED_IN_KEY];

/// Reads and writes the [`LocalSession`] record.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Persist the session, overwriting any previous one.
    pub async fn save(&self, session: &LocalSession) -> StorageResult<()> {
        self.kv.set(USER_ID_KEY, &session.user_id).await?;
        self.kv
            .set(WALLET_ADDRESS_KEY, session.wallet_address.as_str())
            .await?;
        self.kv
            .set(IS_LOGGED_IN_KEY, if session.is_logged_in { "true" } else { "false" })
            .await?;

        info!(user_id = %session.user_id, "User session saved");
        Ok(())
    }

    /// Load the session; `None` unless all three keys are present.
    pub async fn load(&self) -> StorageResult<Option<LocalSession>> {
        let user_id = self.kv.get(USER_ID_KEY).await?;
        let wallet_address = self.kv.get(WALLET_ADDRESS_KEY).await?;
        let is_logged_in = self.kv.get(IS_LOGGED_IN_KEY).await?;

        match (user_id, wallet_address, is_logged_in) {
            (Some(user_id), Some(wallet_address), Some(flag))
                if !user_id.is_empty() && !wallet_address.is_empty() && !flag.is_empty() =>
            {
                Ok(Some(LocalSession {
                    user_id,
                    wallet_address: WalletAddress(wallet_address),
                    is_logged_in: flag == "true",
                }))
            }
            _ => {
                debug!("No complete session in local storage");
                Ok(None)
            }
        }
    }

    /// Remove all session keys.
    pub async fn clear(&self) -> StorageResult<()> {
        self.kv.remove_many(&SESSION_KEYS).await?;
        info!("User session cleared");
        Ok(())
    }

    /// True only for a stored session with the logged-in flag set.
    ///
    /// Storage failures are logged and reported as "no session".
    pub async fn has_active_session(&self) -> bool {
        match self.load().await {
            Ok(session) => session.is_some_and(|s| s.is_logged_in),
            Err(e) => {
                warn!(error = %e, "Failed to check active session");
                false
            }
        }
    }
}
