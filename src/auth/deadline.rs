// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cancellable deadline for a single async operation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineError {
    #[error("deadline of {}s elapsed", .0.as_secs())]
    Elapsed(Duration),
    #[error("operation cancelled")]
    Cancelled,
}

/// Races an operation against a timer and a cancellation token.
///
/// Whichever finishes first wins; the others are dropped.
#[derive(Debug, Clone)]
pub struct Deadline {
    duration: Duration,
    cancel: CancellationToken,
}

impl Deadline {
    pub fn new(duration: Duration) -> Self {
        Self::with_token(duration, CancellationToken::new())
    }

    /// Deadline that is also abandoned when `cancel` fires.
    pub fn with_token(duration: Duration, cancel: CancellationToken) -> Self {
        Self { duration, cancel }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn run<F>(self, operation: F) -> Result<F::Output, DeadlineError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeadlineError::Cancelled),
            output = operation => Ok(output),
            _ = tokio::time::sleep(self.duration) => Err(DeadlineError::Elapsed(self.duration)),
        }
    }
}
