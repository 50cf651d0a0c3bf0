// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scriptable [`WalletProvider`] for hosts without a wallet SDK and for tests.
//!
//! Every call is counted; each action can be switched to fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{WalletError, WalletProvider};
use crate::config::WalletKitConfig;

#[derive(Debug, Default)]
pub struct ManualWalletProvider {
    initialize_calls: AtomicUsize,
    open_modal_calls: AtomicUsize,
    close_modal_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    fail_initialize: AtomicBool,
    fail_open_modal: AtomicBool,
    fail_close_modal: AtomicBool,
    fail_disconnect: AtomicBool,
}

impl ManualWalletProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    pub fn fail_open_modal(&self, fail: bool) {
        self.fail_open_modal.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close_modal(&self, fail: bool) {
        self.fail_close_modal.store(fail, Ordering::SeqCst);
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn open_modal_calls(&self) -> usize {
        self.open_modal_calls.load(Ordering::SeqCst)
    }

    pub fn close_modal_calls(&self) -> usize {
        self.close_modal_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for ManualWalletProvider {
    async fn initialize(&self, _config: &WalletKitConfig) -> Result<(), WalletError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(WalletError::Initialization("provider refused configuration".into()));
        }
        Ok(())
    }

    async fn open_modal(&self) -> Result<(), WalletError> {
        self.open_modal_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_open_modal.load(Ordering::SeqCst) {
            return Err(WalletError::ModalOpen("modal unavailable".into()));
        }
        Ok(())
    }

    async fn close_modal(&self) -> Result<(), WalletError> {
        self.close_modal_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close_modal.load(Ordering::SeqCst) {
            return Err(WalletError::ModalClose("modal not open".into()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(WalletError::Disconnect("session already gone".into()));
        }
        Ok(())
    }
}
