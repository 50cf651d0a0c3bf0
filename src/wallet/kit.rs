// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time wallet SDK bootstrap.
//!
//! The host creates a single [`WalletKit`] at startup and shares it.
//! `ensure_initialized` configures the provider on the first call; later
//! and concurrent calls wait for and return the same ready state. A failed
//! attempt leaves the kit uninitialized so the next call tries again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{WalletError, WalletProvider};
use crate::config::WalletKitConfig;

/// Result of a successful bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitReady {
    pub project_id: String,
    pub chain_ids: Vec<u64>,
    pub initialized_at: DateTime<Utc>,
}

pub struct WalletKit {
    config: WalletKitConfig,
    provider: Arc<dyn WalletProvider>,
    ready: OnceCell<KitReady>,
}

impl WalletKit {
    pub fn new(config: WalletKitConfig, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            config,
            provider,
            ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &WalletKitConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Initialize the provider once.
    pub async fn ensure_initialized(&self) -> Result<&KitReady, WalletError> {
        self.ready
            .get_or_try_init(|| async {
                if self.config.project_id.trim().is_empty() {
                    return Err(WalletError::Initialization(
                        "wallet project id is not configured".to_string(),
                    ));
                }
                if let Err(e) = self.provider.initialize(&self.config).await {
                    warn!(error = %e, "Wallet kit initialization failed");
                    return Err(e);
                }

                let ready = KitReady {
                    project_id: self.config.project_id.clone(),
                    chain_ids: self.config.chains.iter().map(|c| c.chain_id).collect(),
                    initialized_at: Utc::now(),
                };
                info!(
                    project_id = %ready.project_id,
                    chains = ?ready.chain_ids,
                    app = %self.config.metadata.name,
                    "Wallet kit initialized"
                );
                Ok(ready)
            })
            .await
    }
}
