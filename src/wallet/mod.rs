// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Connection
//!
//! Thin layer over the wallet-connection SDK.
//!
//! - [`WalletProvider`]: the SDK seam (modal, disconnect, bootstrap)
//! - [`WalletAdapter`]: connect/disconnect actions plus live state
//! - [`WalletFeed`]: where the SDK pushes [`WalletConnectionState`] updates
//! - [`ConnectionEvents`]: de-duplicated [`ConnectionChanged`] stream
//! - [`WalletKit`]: one-time SDK bootstrap
//!
//! [`WalletConnectionState`]: crate::models::WalletConnectionState
//! [`ConnectionChanged`]: crate::models::ConnectionChanged

pub mod adapter;
pub mod kit;
pub mod manual;

use async_trait::async_trait;

use crate::config::WalletKitConfig;

pub use adapter::{ConnectionEvents, WalletAdapter, WalletFeed};
pub use kit::{KitReady, WalletKit};
pub use manual::ManualWalletProvider;

/// Wallet SDK failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("failed to open wallet modal: {0}")]
    ModalOpen(String),

    #[error("failed to close wallet modal: {0}")]
    ModalClose(String),

    #[error("wallet disconnect failed: {0}")]
    Disconnect(String),

    #[error("wallet kit initialization failed: {0}")]
    Initialization(String),
}

/// The wallet-connection SDK.
///
/// Connection state is not returned from these calls; the SDK reports it
/// asynchronously through a [`WalletFeed`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Configure the SDK. Called at most once per [`WalletKit`].
    async fn initialize(&self, config: &WalletKitConfig) -> Result<(), WalletError>;

    /// Show the wallet picker.
    async fn open_modal(&self) -> Result<(), WalletError>;

    async fn close_modal(&self) -> Result<(), WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;
}
