//! Cancellable registry calls
//!
//! Registry operations suspend on wallet approval and on block confirmation,
//! neither of which is bounded. [`PendingCall`] runs an operation on the tokio
//! runtime, exposes its state, and lets the caller abandon it through a
//! [`CancelToken`].
//!
//! Cancelling drops the in-flight future. A transaction that was already
//! broadcast stays in the mempool; only the wait for it is abandoned.

use crate::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cloneable cancellation signal shared between a caller and its calls
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.inner.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone
    pub async fn cancelled(&self) {
        let mut rx = self.inner.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Observable state of a [`PendingCall`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Pending,
    Resolved,
    Rejected,
    Cancelled,
}

/// A registry operation running in the background
pub struct PendingCall<T> {
    state: watch::Receiver<CallState>,
    token: CancelToken,
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> PendingCall<T> {
    /// Spawn `call`, racing it against `token`
    pub fn spawn<F>(token: CancelToken, call: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (state_tx, state) = watch::channel(CallState::Pending);
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = task_token.cancelled() => Err(Error::Cancelled),
                result = call => result,
            };
            let settled = match &outcome {
                Ok(_) => CallState::Resolved,
                Err(Error::Cancelled) => CallState::Cancelled,
                Err(_) => CallState::Rejected,
            };
            state_tx.send_replace(settled);
            outcome
        });

        Self {
            state,
            token,
            handle,
        }
    }

    pub fn state(&self) -> CallState {
        *self.state.borrow()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait until the call leaves [`CallState::Pending`]
    pub async fn settled(&mut self) -> CallState {
        match self.state.wait_for(|s| *s != CallState::Pending).await {
            Ok(state) => *state,
            // Task is gone without reporting, i.e. it panicked
            Err(_) => CallState::Rejected,
        }
    }

    /// Wait for the call's result
    pub async fn wait(self) -> Result<T> {
        self.handle
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();

        assert!(clone.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), clone.cancelled())
            .await
            .expect("cancelled() should resolve");
    }

    #[tokio::test]
    async fn test_resolved_call() {
        let mut call = PendingCall::spawn(CancelToken::new(), async { Ok(7u64) });

        assert_eq!(call.settled().await, CallState::Resolved);
        assert_eq!(call.state(), CallState::Resolved);
        assert_eq!(call.wait().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_rejected_call() {
        let mut call: PendingCall<u64> =
            PendingCall::spawn(CancelToken::new(), async { Err(Error::WalletUnavailable) });

        assert_eq!(call.settled().await, CallState::Rejected);
        assert!(matches!(call.wait().await, Err(Error::WalletUnavailable)));
    }

    #[tokio::test]
    async fn test_cancel_pending_call() {
        let mut call: PendingCall<u64> =
            PendingCall::spawn(CancelToken::new(), std::future::pending());
        assert_eq!(call.state(), CallState::Pending);

        call.cancel();

        assert_eq!(call.settled().await, CallState::Cancelled);
        assert!(matches!(call.wait().await, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_wins() {
        let token = CancelToken::new();
        token.cancel();

        let call = PendingCall::spawn(token, async { Ok(1u64) });

        assert!(matches!(call.wait().await, Err(Error::Cancelled)));
    }
}
