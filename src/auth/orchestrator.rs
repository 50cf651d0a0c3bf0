// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Orchestrator
//!
//! Ties wallet connection events to the user directory and the local
//! session store.
//!
//! ## Attempts
//!
//! Each wallet connection gets at most one directory lookup. Starting a
//! lookup stores an attempt id and a cancellation token in the flow state;
//! that guard is released when the lookup fails or times out, when the
//! wallet disconnects, on logout and on remount. A lookup whose guard is
//! gone by the time it returns is discarded.
//!
//! ## Locking
//!
//! Flow state sits behind a `std::sync::Mutex` that is only taken inside
//! synchronous helpers, never across an `.await`.
//!
//! Session writes and the logout clear are serialized by a separate async
//! lock. A write re-checks, under that lock, that its attempt or session
//! epoch is still current, so a logout can never be followed by a late
//! `is_logged_in` write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::deadline::{Deadline, DeadlineError};
use super::state::{AuthState, Route};
use crate::config::DEFAULT_AUTH_TIMEOUT;
use crate::directory::UserDirectory;
use crate::error::{AuthError, AuthResult};
use crate::models::{ConnectionChanged, LocalSession, UserRecord, WalletAddress};
use crate::storage::SessionStore;
use crate::validation::{Username, UsernameError};
use crate::wallet::{ConnectionEvents, WalletAdapter};

/// Capacity of the failure broadcast channel.
const FAILURE_CHANNEL_CAPACITY: usize = 16;

/// Outcome of a username availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameStatus {
    Available(Username),
    Taken(Username),
    Invalid(UsernameError),
}

/// A failed background authentication, as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&AuthError> for AuthFailure {
    fn from(err: &AuthError) -> Self {
        Self {
            code: err.error_code(),
            message: err.user_message(),
            retryable: err.is_retryable(),
        }
    }
}

struct Attempt {
    id: u64,
    cancel: CancellationToken,
}

struct Flow {
    state: AuthState,
    /// In-flight or completed lookup for the current wallet connection.
    attempt: Option<Attempt>,
    /// Account creation in progress.
    submitting: bool,
    /// Bumped by logout and remount. Writes started under an older epoch
    /// must not persist a session.
    epoch: u64,
}

impl Flow {
    fn holds(&self, attempt: u64) -> bool {
        self.attempt.as_ref().map(|a| a.id) == Some(attempt)
    }

    /// Invalidate in-flight session writes.
    fn reset_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.submitting = false;
    }

    fn release_attempt(&mut self) -> Option<u64> {
        self.attempt.take().map(|attempt| {
            attempt.cancel.cancel();
            attempt.id
        })
    }
}

/// A lookup that has been admitted and is ready to run.
struct PendingLookup {
    attempt: u64,
    address: WalletAddress,
    cancel: CancellationToken,
}

pub struct AuthOrchestrator {
    sessions: SessionStore,
    directory: Arc<dyn UserDirectory>,
    wallet: Arc<WalletAdapter>,
    auth_timeout: Duration,
    flow: Mutex<Flow>,
    /// Held across a session save or clear.
    session_writes: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<AuthState>,
    failures_tx: broadcast::Sender<AuthFailure>,
    next_attempt: AtomicU64,
}

impl AuthOrchestrator {
    pub fn new(
        sessions: SessionStore,
        directory: Arc<dyn UserDirectory>,
        wallet: Arc<WalletAdapter>,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::CheckingSession);
        let (failures_tx, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            sessions,
            directory,
            wallet,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            flow: Mutex::new(Flow {
                state: AuthState::CheckingSession,
                attempt: None,
                submitting: false,
                epoch: 0,
            }),
            session_writes: tokio::sync::Mutex::new(()),
            state_tx,
            failures_tx,
            next_attempt: AtomicU64::new(0),
        }
    }

    /// Override the directory lookup deadline.
    pub fn with_timeout(mut self, auth_timeout: Duration) -> Self {
        self.auth_timeout = auth_timeout;
        self
    }

    pub fn wallet(&self) -> &WalletAdapter {
        &self.wallet
    }

    pub fn state(&self) -> AuthState {
        self.flow().state.clone()
    }

    pub fn route(&self) -> Route {
        self.flow().state.route()
    }

    /// Watch state changes. Transient states may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Failures of lookups started from the event loop.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<AuthFailure> {
        self.failures_tx.subscribe()
    }

    // =========================================================================
    // Session check
    // =========================================================================

    /// Entry point when the login screen appears.
    ///
    /// A stored logged-in session goes straight to `LoggedIn` without
    /// touching the wallet or the directory. Otherwise the flow waits for a
    /// wallet, and an already connected wallet is authenticated at once.
    pub async fn mount(&self) -> AuthResult<AuthState> {
        {
            let mut flow = self.flow();
            flow.release_attempt();
            flow.reset_epoch();
            self.set_state(&mut flow, AuthState::CheckingSession);
        }

        let session = match self.sessions.load().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to read local session, continuing without one");
                None
            }
        };

        if let Some(session) = session.filter(|s| s.is_logged_in) {
            return Ok(self.restore_session(session));
        }

        {
            let mut flow = self.flow();
            self.set_state(&mut flow, AuthState::NoSession);
            self.set_state(&mut flow, AuthState::AwaitingWallet);
        }

        let wallet = ConnectionChanged::from(&self.wallet.state());
        if wallet.connected_address().is_some() {
            return self.handle_connection(wallet).await;
        }
        Ok(self.state())
    }

    fn restore_session(&self, session: LocalSession) -> AuthState {
        info!(user_id = %session.user_id, "Restored local session");
        let mut flow = self.flow();
        self.set_state(&mut flow, AuthState::SessionFound { session: session.clone() });
        self.set_state(&mut flow, AuthState::LoggedIn { session });
        flow.state.clone()
    }

    // =========================================================================
    // Wallet connection
    // =========================================================================

    /// React to a wallet connection change.
    ///
    /// A connected address in `AwaitingWallet` / `WalletConnected` starts a
    /// lookup bounded by the auth timeout; other states ignore connections.
    /// Timeouts and directory failures return to `WalletConnected` and are
    /// returned as retryable errors.
    pub async fn handle_connection(&self, event: ConnectionChanged) -> AuthResult<AuthState> {
        match self.admit(&event) {
            Some(lookup) => self.authenticate(lookup).await,
            None => Ok(self.state()),
        }
    }

    /// Apply the synchronous part of a connection event.
    fn admit(&self, event: &ConnectionChanged) -> Option<PendingLookup> {
        let Some(address) = event.connected_address().cloned() else {
            if !event.is_connected {
                self.on_wallet_disconnected();
            }
            return None;
        };

        let mut flow = self.flow();
        if !matches!(
            flow.state,
            AuthState::AwaitingWallet | AuthState::WalletConnected { .. }
        ) {
            debug!(state = flow.state.name(), "Ignoring wallet connection");
            return None;
        }
        if flow.attempt.is_some() {
            debug!("Wallet connection already being authenticated");
            return None;
        }

        let attempt = self.next_attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        flow.attempt = Some(Attempt {
            id: attempt,
            cancel: cancel.clone(),
        });
        self.set_state(
            &mut flow,
            AuthState::WalletConnected {
                address: address.clone(),
            },
        );
        self.set_state(
            &mut flow,
            AuthState::Authenticating {
                address: address.clone(),
                attempt,
            },
        );

        Some(PendingLookup {
            attempt,
            address,
            cancel,
        })
    }

    async fn authenticate(&self, lookup: PendingLookup) -> AuthResult<AuthState> {
        let PendingLookup {
            attempt,
            address,
            cancel,
        } = lookup;

        info!(attempt, wallet_address = %address.shortened(), "Looking up user for wallet");

        let outcome = Deadline::with_token(self.auth_timeout, cancel)
            .run(self.directory.find_by_wallet_address(&address))
            .await;

        let found = match outcome {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => return self.fail_attempt(attempt, address, e.into()),
            Err(DeadlineError::Elapsed(after)) => {
                return self.fail_attempt(attempt, address, AuthError::Timeout(after))
            }
            Err(DeadlineError::Cancelled) => {
                debug!(attempt, "Wallet lookup cancelled");
                return Ok(self.state());
            }
        };

        match found {
            Some(user) => self.log_in_existing(attempt, user).await,
            None => Ok(self.await_username(attempt, address)),
        }
    }

    async fn log_in_existing(&self, attempt: u64, user: UserRecord) -> AuthResult<AuthState> {
        {
            let mut flow = self.flow();
            if !flow.holds(attempt) {
                debug!(attempt, "Discarding result of superseded lookup");
                return Ok(flow.state.clone());
            }
            self.set_state(&mut flow, AuthState::ExistingUser { user: user.clone() });
        }

        let session = LocalSession::for_user(&user);
        let saved = {
            let _writes = self.session_writes.lock().await;
            let current = self.flow().holds(attempt);
            if !current {
                debug!(attempt, "Lookup superseded before the session was written");
                return Ok(self.state());
            }
            self.sessions.save(&session).await
        };
        if let Err(e) = saved {
            return self.fail_attempt(attempt, user.wallet_address, e.into());
        }

        let mut flow = self.flow();
        if flow.holds(attempt) {
            info!(user_id = %user.id, username = %user.username, "User logged in");
            self.set_state(&mut flow, AuthState::LoggedIn { session });
        }
        Ok(flow.state.clone())
    }

    fn await_username(&self, attempt: u64, address: WalletAddress) -> AuthState {
        let mut flow = self.flow();
        if !flow.holds(attempt) {
            debug!(attempt, "Discarding result of superseded lookup");
            return flow.state.clone();
        }
        info!(wallet_address = %address.shortened(), "No user for wallet, username required");
        self.set_state(
            &mut flow,
            AuthState::NewUser {
                address: address.clone(),
            },
        );
        self.set_state(&mut flow, AuthState::AwaitingUsername { address });
        flow.state.clone()
    }

    /// Release the guard and return to `WalletConnected`, unless the
    /// attempt was already superseded.
    fn fail_attempt(
        &self,
        attempt: u64,
        address: WalletAddress,
        err: AuthError,
    ) -> AuthResult<AuthState> {
        {
            let mut flow = self.flow();
            if !flow.holds(attempt) {
                debug!(attempt, error = %err, "Discarding failure of superseded lookup");
                return Ok(flow.state.clone());
            }
            flow.attempt = None;
            self.set_state(&mut flow, AuthState::WalletConnected { address });
        }

        warn!(attempt, error = %err, code = err.error_code(), "Wallet authentication failed");
        let _ = self.failures_tx.send(AuthFailure::from(&err));
        Err(err)
    }

    fn on_wallet_disconnected(&self) {
        let mut flow = self.flow();
        let resets = match flow.state {
            AuthState::AwaitingWallet
            | AuthState::WalletConnected { .. }
            | AuthState::Authenticating { .. } => true,
            AuthState::AwaitingUsername { .. } => !flow.submitting,
            _ => false,
        };
        if !resets {
            debug!(state = flow.state.name(), "Wallet disconnect leaves state unchanged");
            return;
        }

        if let Some(attempt) = flow.release_attempt() {
            info!(attempt, "Wallet disconnected, authentication guard cleared");
        }
        if flow.state != AuthState::AwaitingWallet {
            self.set_state(&mut flow, AuthState::AwaitingWallet);
        }
    }

    // =========================================================================
    // Username setup
    // =========================================================================

    /// Normalize, validate and check availability of a username.
    ///
    /// Invalid and taken usernames are reported in the status, not as
    /// errors; only directory failures are errors.
    pub async fn check_username(&self, candidate: &str) -> AuthResult<UsernameStatus> {
        let username = match Username::parse(candidate) {
            Ok(username) => username,
            Err(e) => return Ok(UsernameStatus::Invalid(e)),
        };

        if self.directory.is_username_taken(username.as_str()).await? {
            Ok(UsernameStatus::Taken(username))
        } else {
            Ok(UsernameStatus::Available(username))
        }
    }

    /// Create the account for the connected wallet and log in.
    ///
    /// Only valid in `AwaitingUsername`. Validation failures and taken
    /// usernames leave the state unchanged so the user can try again. A
    /// logout or remount before the session is written aborts the login;
    /// the created account stays in the directory.
    pub async fn submit_username(&self, candidate: &str) -> AuthResult<UserRecord> {
        let (address, epoch) = {
            let mut flow = self.flow();
            let address = match &flow.state {
                AuthState::AwaitingUsername { address } => address.clone(),
                AuthState::NoSession | AuthState::AwaitingWallet => {
                    return Err(AuthError::WalletNotConnected)
                }
                other => {
                    return Err(AuthError::InvalidState {
                        operation: "submit a username",
                        state: other.name(),
                    })
                }
            };
            if flow.submitting {
                return Err(AuthError::InvalidState {
                    operation: "submit a username",
                    state: "creating an account",
                });
            }
            flow.submitting = true;
            (address, flow.epoch)
        };

        let created = self.create_account(&address, candidate, epoch).await;

        let mut flow = self.flow();
        if flow.epoch == epoch {
            flow.submitting = false;
        }
        let (user, session) = match created {
            Ok(created) => created,
            Err(e) => {
                debug!(error = %e, "Account creation rejected");
                return Err(e);
            }
        };

        info!(user_id = %user.id, username = %user.username, "Account created");
        if matches!(flow.state, AuthState::AwaitingUsername { .. }) {
            self.set_state(&mut flow, AuthState::AccountCreated { user: user.clone() });
            self.set_state(&mut flow, AuthState::LoggedIn { session });
        }
        Ok(user)
    }

    async fn create_account(
        &self,
        address: &WalletAddress,
        candidate: &str,
        epoch: u64,
    ) -> AuthResult<(UserRecord, LocalSession)> {
        let username = Username::parse(candidate)?;

        if self.directory.is_username_taken(username.as_str()).await? {
            return Err(AuthError::UsernameTaken(username.into_inner()));
        }

        let Some(user) = self
            .directory
            .create_unique(address, username.as_str())
            .await?
        else {
            return Err(AuthError::UsernameTaken(username.into_inner()));
        };

        let session = LocalSession::for_user(&user);
        let _writes = self.session_writes.lock().await;
        let stale = {
            let flow = self.flow();
            (flow.epoch != epoch).then(|| flow.state.name())
        };
        if let Some(state) = stale {
            info!(user_id = %user.id, "Account created after the flow was reset, not logging in");
            return Err(AuthError::InvalidState {
                operation: "finish sign-up",
                state,
            });
        }
        self.sessions.save(&session).await?;
        Ok((user, session))
    }

    // =========================================================================
    // Profile and logout
    // =========================================================================

    /// Reload the logged-in user's record.
    ///
    /// A session whose user no longer exists is `CorruptedSession`; the
    /// caller is expected to log out.
    pub async fn load_profile(&self) -> AuthResult<UserRecord> {
        let session = match self.sessions.load().await? {
            Some(session) if session.is_logged_in => session,
            _ => return Err(AuthError::NotLoggedIn),
        };

        match self.directory.find_by_id(&session.user_id).await? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %session.user_id, "Session references a missing user");
                Err(AuthError::CorruptedSession {
                    user_id: session.user_id,
                })
            }
        }
    }

    /// Clear the local session, then disconnect the wallet.
    ///
    /// Succeeds once the session is cleared; a failing wallet disconnect
    /// is only logged.
    pub async fn logout(&self) -> AuthResult<()> {
        let previous = {
            let mut flow = self.flow();
            flow.release_attempt();
            flow.reset_epoch();
            let previous = flow.state.clone();
            self.set_state(&mut flow, AuthState::LoggingOut);
            previous
        };

        let cleared = {
            let _writes = self.session_writes.lock().await;
            self.sessions.clear().await
        };
        if let Err(e) = cleared {
            warn!(error = %e, "Failed to clear local session");
            let mut flow = self.flow();
            if flow.state == AuthState::LoggingOut {
                let restored = match previous {
                    AuthState::Authenticating { address, .. } => {
                        AuthState::WalletConnected { address }
                    }
                    other => other,
                };
                self.set_state(&mut flow, restored);
            }
            return Err(e.into());
        }

        self.wallet.disconnect().await;

        {
            let mut flow = self.flow();
            self.set_state(&mut flow, AuthState::NoSession);
        }
        info!("User logged out");
        Ok(())
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Feed wallet events into the flow until `shutdown` fires or the
    /// stream ends.
    ///
    /// Lookups run on their own tasks so a disconnect arriving mid-lookup
    /// is applied immediately. Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(orchestrator.clone().run(wallet.subscribe(), shutdown.clone()));
    /// ```
    pub async fn run(self: Arc<Self>, mut events: ConnectionEvents, shutdown: CancellationToken) {
        info!("Auth orchestrator listening for wallet events");

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Auth orchestrator shutting down");
                    return;
                }
                event = events.next() => event,
            };

            let Some(event) = event else {
                info!("Wallet event stream closed");
                return;
            };

            if let Some(lookup) = self.admit(&event) {
                let this = Arc::clone(&self);
                tokio::spawn(async move {
                    // Failures are logged and published by the lookup itself
                    let _ = this.authenticate(lookup).await;
                });
            }
        }
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn flow(&self) -> MutexGuard<'_, Flow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, flow: &mut Flow, next: AuthState) {
        debug!(from = flow.state.name(), to = next.name(), "Auth state transition");
        flow.state = next.clone();
        self.state_tx.send_replace(next);
    }
}
