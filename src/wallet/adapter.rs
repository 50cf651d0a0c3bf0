// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet adapter: actions toward the SDK, state pushed back from it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{WalletError, WalletProvider};
use crate::models::{ConnectionChanged, WalletAddress, WalletConnectionState};

/// Connection status and actions for the current wallet.
pub struct WalletAdapter {
    provider: Arc<dyn WalletProvider>,
    state_tx: watch::Sender<WalletConnectionState>,
}

impl WalletAdapter {
    /// Create an adapter starting in the disconnected state.
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        let (state_tx, _) = watch::channel(WalletConnectionState::disconnected());
        Self { provider, state_tx }
    }

    /// Snapshot of the latest pushed state.
    pub fn state(&self) -> WalletConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state_tx.borrow().is_connected
    }

    /// Active address, if connected.
    pub fn address(&self) -> Option<WalletAddress> {
        let state = self.state_tx.borrow();
        if state.is_connected {
            state.address.clone()
        } else {
            None
        }
    }

    /// Handle for the SDK to push state updates into.
    pub fn feed(&self) -> WalletFeed {
        WalletFeed {
            state_tx: self.state_tx.clone(),
        }
    }

    /// Stream of connection changes, starting with the current state.
    pub fn subscribe(&self) -> ConnectionEvents {
        ConnectionEvents::new(self.state_tx.subscribe())
    }

    /// Open the wallet picker. The connection result arrives via the feed.
    pub async fn connect(&self) -> Result<(), WalletError> {
        debug!("Opening wallet modal");
        self.provider.open_modal().await
    }

    /// Close the wallet picker. Failures are logged only.
    pub async fn close_modal(&self) {
        if let Err(e) = self.provider.close_modal().await {
            warn!(error = %e, "Failed to close wallet modal");
        }
    }

    /// Best-effort disconnect. Failures are logged only.
    pub async fn disconnect(&self) {
        match self.provider.disconnect().await {
            Ok(()) => {
                self.state_tx.send_replace(WalletConnectionState::disconnected());
                info!("Wallet disconnected");
            }
            Err(e) => warn!(error = %e, "Wallet disconnect failed"),
        }
    }
}

/// Producer side of the connection state channel.
#[derive(Clone)]
pub struct WalletFeed {
    state_tx: watch::Sender<WalletConnectionState>,
}

impl WalletFeed {
    pub fn push(&self, state: WalletConnectionState) {
        debug!(
            is_connected = state.is_connected,
            is_connecting = state.is_connecting,
            "Wallet state pushed"
        );
        self.state_tx.send_replace(state);
    }
}

/// Connection changes as seen by a single consumer.
///
/// Updates that only toggle `is_connecting` are skipped, and intermediate
/// states pushed faster than they are consumed collapse into the latest.
pub struct ConnectionEvents {
    state_rx: watch::Receiver<WalletConnectionState>,
    last: Option<ConnectionChanged>,
}

impl ConnectionEvents {
    fn new(mut state_rx: watch::Receiver<WalletConnectionState>) -> Self {
        // Deliver the current state on the first poll
        state_rx.mark_changed();
        Self {
            state_rx,
            last: None,
        }
    }

    /// Next change, or `None` once every producer is gone.
    pub async fn next(&mut self) -> Option<ConnectionChanged> {
        loop {
            if self.state_rx.changed().await.is_err() {
                return None;
            }
            let event = ConnectionChanged::from(&*self.state_rx.borrow_and_update());
            if self.last.as_ref() != Some(&event) {
                self.last = Some(event.clone());
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::ManualWalletProvider;

    fn adapter() -> (Arc<ManualWalletProvider>, WalletAdapter) {
        let provider = Arc::new(ManualWalletProvider::new());
        let adapter = WalletAdapter::new(provider.clone());
        (provider, adapter)
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let (_, adapter) = adapter();
        assert!(!adapter.is_connected());
        assert!(adapter.address().is_none());
        assert_eq!(adapter.state(), WalletConnectionState::disconnected());
    }

    #[tokio::test]
    async fn feed_updates_state() {
        let (_, adapter) = adapter();
        adapter.feed().push(WalletConnectionState::connected("0xAbC"));
        assert!(adapter.is_connected());
        assert_eq!(adapter.address(), Some(WalletAddress::from("0xAbC")));
    }

    #[tokio::test]
    async fn connect_opens_modal() {
        let (provider, adapter) = adapter();
        adapter.connect().await.unwrap();
        assert_eq!(provider.open_modal_calls(), 1);
    }

    #[tokio::test]
    async fn connect_propagates_modal_error() {
        let (provider, adapter) = adapter();
        provider.fail_open_modal(true);
        assert!(matches!(adapter.connect().await, Err(WalletError::ModalOpen(_))));
    }

    #[tokio::test]
    async fn disconnect_failure_is_swallowed() {
        let (provider, adapter) = adapter();
        adapter.feed().push(WalletConnectionState::connected("0xabc"));
        provider.fail_disconnect(true);

        adapter.disconnect().await;

        assert_eq!(provider.disconnect_calls(), 1);
        // State is left to the provider when the call fails
        assert!(adapter.is_connected());
    }

    #[tokio::test]
    async fn disconnect_success_clears_state() {
        let (_, adapter) = adapter();
        adapter.feed().push(WalletConnectionState::connected("0xabc"));
        adapter.disconnect().await;
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn close_modal_failure_is_swallowed() {
        let (provider, adapter) = adapter();
        provider.fail_close_modal(true);
        adapter.close_modal().await;
        assert_eq!(provider.close_modal_calls(), 1);
    }

    #[tokio::test]
    async fn events_start_with_current_state() {
        let (_, adapter) = adapter();
        adapter.feed().push(WalletConnectionState::connected("0xabc"));

        let mut events = adapter.subscribe();
        let first = events.next().await.unwrap();
        assert_eq!(first.connected_address(), Some(&WalletAddress::from("0xabc")));
    }

    #[tokio::test]
    async fn events_skip_connecting_only_updates() {
        let (_, adapter) = adapter();
        let feed = adapter.feed();
        let mut events = adapter.subscribe();

        let first = events.next().await.unwrap();
        assert!(!first.is_connected);

        feed.push(WalletConnectionState::connecting());
        feed.push(WalletConnectionState::connected("0xabc"));
        let next = events.next().await.unwrap();
        assert!(next.is_connected);

        feed.push(WalletConnectionState::disconnected());
        let next = events.next().await.unwrap();
        assert!(!next.is_connected);
        assert!(next.address.is_none());
    }

    #[tokio::test]
    async fn events_end_when_producers_drop() {
        let (_, adapter) = adapter();
        let mut events = adapter.subscribe();
        assert!(events.next().await.is_some());

        drop(adapter);
        assert!(events.next().await.is_none());
    }
}
