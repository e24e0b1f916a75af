//! Cancellable background runs (glyph pulses, playback).

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

/// Shared cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives in `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Whether both tokens control the same run.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}

/// Sleeps for `duration` unless cancelled first. Returns false on cancellation.
pub(crate) async fn sleep_or_cancel(token: &CancelToken, duration: Duration) -> bool {
    if token.is_cancelled() {
        return false;
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => !token.is_cancelled(),
        () = token.cancelled() => false,
    }
}

/// How a background run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// Every step ran.
    Completed,
    /// The run stopped early on request.
    Cancelled,
}

/// Handle to a spawned glyph or playback run.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancelToken,
    join: JoinHandle<RunOutcome>,
}

impl TaskHandle {
    pub(crate) fn new(token: CancelToken, join: JoinHandle<RunOutcome>) -> Self {
        Self { token, join }
    }

    /// Requests cancellation of the run.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token controlling the run.
    #[must_use]
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Whether the run has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the run to end.
    pub async fn wait(self) -> RunOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Background run failed: {e}");
                RunOutcome::Cancelled
            }
        }
    }
}
