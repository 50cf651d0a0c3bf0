// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the crate. Configuration is loaded from the environment once
//! by the host application and handed to the orchestrator.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the device-local key-value store | `./data` |
//! | `AUTH_TIMEOUT_SECS` | Deadline for the wallet-address lookup | `10` |
//! | `ENV_FIREBASE_APIKEY` | Firestore web API key | Required for Firestore |
//! | `ENV_FIREBASE_PROJECTID` | Firestore project id | Required for Firestore |
//! | `ENV_PROJECTID_REOWN` | Wallet-connection SDK project id | Required for wallet bootstrap |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogFormat;

/// Environment variable name for the local data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default local data directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Environment variable name for the authentication lookup deadline.
pub const AUTH_TIMEOUT_ENV: &str = "AUTH_TIMEOUT_SECS";

/// How long the wallet-address lookup may run before the attempt is abandoned.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable name for the Firestore web API key.
pub const FIREBASE_API_KEY_ENV: &str = "ENV_FIREBASE_APIKEY";

/// Environment variable name for the Firestore project id.
pub const FIREBASE_PROJECT_ID_ENV: &str = "ENV_FIREBASE_PROJECTID";

/// Environment variable name for the wallet-connection SDK project id.
pub const REOWN_PROJECT_ID_ENV: &str = "ENV_PROJECTID_REOWN";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// EVM network offered in the wallet-connection modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Native currency symbol
    pub currency: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// RPC endpoint URL
    pub rpc_url: &'static str,
}

/// Ethereum mainnet.
pub const ETHEREUM_MAINNET: ChainConfig = ChainConfig {
    name: "Ethereum",
    chain_id: 1,
    currency: "ETH",
    explorer_url: "https://etherscan.io",
    rpc_url: "https://cloudflare-eth.com",
};

/// Polygon PoS mainnet.
pub const POLYGON: ChainConfig = ChainConfig {
    name: "Polygon",
    chain_id: 137,
    currency: "MATIC",
    explorer_url: "https://polygonscan.com",
    rpc_url: "https://polygon-rpc.com",
};

/// BNB Smart Chain mainnet.
pub const BSC_MAINNET: ChainConfig = ChainConfig {
    name: "BSC Mainnet",
    chain_id: 56,
    currency: "BNB",
    explorer_url: "https://bscscan.com/",
    rpc_url: "https://bsc-dataseed.bnbchain.org",
};

/// App metadata shown by wallets during pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
    /// Deep link the wallet redirects back to.
    pub native_redirect: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "M2M".to_string(),
            description: "M2M App".to_string(),
            url: "https://reown.com/appkit".to_string(),
            icons: vec!["https://avatars.githubusercontent.com/u/179229932".to_string()],
            native_redirect: "M2M://".to_string(),
        }
    }
}

/// Wallet-connection SDK bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletKitConfig {
    pub project_id: String,
    pub metadata: AppMetadata,
    pub chains: Vec<ChainConfig>,
}

impl WalletKitConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            metadata: AppMetadata::default(),
            chains: vec![ETHEREUM_MAINNET, POLYGON, BSC_MAINNET],
        }
    }
}

/// Firestore connection settings for the remote user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
    /// Override for the REST endpoint (emulators, tests).
    pub base_url: String,
}

/// Public Firestore REST endpoint.
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            base_url: FIRESTORE_BASE_URL.to_string(),
        }
    }

    /// Use a different REST endpoint, e.g. a local emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Everything the authentication flow needs from the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub data_dir: PathBuf,
    pub auth_timeout: Duration,
    pub log_format: LogFormat,
    /// `None` when the Firestore variables are not set.
    pub firestore: Option<FirestoreConfig>,
    /// `None` when no wallet SDK project id is set.
    pub wallet_kit: Option<WalletKitConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            log_format: LogFormat::default(),
            firestore: None,
            wallet_kit: None,
        }
    }
}

impl AuthConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = non_empty(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let auth_timeout = non_empty(AUTH_TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_AUTH_TIMEOUT);

        let log_format = non_empty(LOG_FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        let firestore = match (
            non_empty(FIREBASE_PROJECT_ID_ENV),
            non_empty(FIREBASE_API_KEY_ENV),
        ) {
            (Some(project_id), Some(api_key)) => Some(FirestoreConfig::new(project_id, api_key)),
            _ => None,
        };

        let wallet_kit = non_empty(REOWN_PROJECT_ID_ENV).map(WalletKitConfig::new);

        Self {
            data_dir,
            auth_timeout,
            log_format,
            firestore,
            wallet_kit,
        }
    }
}
