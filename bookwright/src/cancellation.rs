//! Cancellation support for in-flight generation calls.
//!
//! Every network call the orchestrator issues carries a
//! [`CancellationToken`] scoped to the owning project. Cancelling a
//! project's token aborts the in-flight call; nothing the call produced
//! is recorded and the checkpoint keeps its pre-call value.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// Token for coordinating cancellation of a single generation call.
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
    notify: Notify,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("reason", &self.reason.lock())
            .finish()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
            notify: Notify::new(),
        }
    }
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason if cancelled.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Requests cancellation with a reason.
    ///
    /// Idempotent; only the first reason is stored.
    pub fn cancel(&self, reason: impl Into<String>) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            *self.reason.lock() = Some(reason.into());
            self.notify.notify_waiters();
        }
    }

    /// Waits until cancellation is requested.
    ///
    /// Returns immediately if the token is already cancelled.
    pub async fn cancelled_wait(&self) {
        loop {
            // Register interest before checking the flag to avoid missing
            // a notify between the check and the await.
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Registry of the active cancellation token per project.
///
/// Each new generation call replaces the project's token; cancelling a
/// project fires whichever token is current.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: DashMap<Uuid, Arc<CancellationToken>>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for the project, replacing any prior one.
    pub fn issue(&self, project_id: Uuid) -> Arc<CancellationToken> {
        let token = CancellationToken::new();
        self.tokens.insert(project_id, token.clone());
        token
    }

    /// Cancels the project's active token, if any.
    ///
    /// Returns true if a token was present.
    pub fn cancel(&self, project_id: Uuid, reason: impl Into<String>) -> bool {
        if let Some(token) = self.tokens.get(&project_id) {
            token.cancel(reason);
            true
        } else {
            false
        }
    }

    /// Cancels every active token.
    pub fn cancel_all(&self, reason: &str) {
        for entry in &self.tokens {
            entry.value().cancel(reason);
        }
    }

    /// Drops the project's token without cancelling it.
    pub fn release(&self, project_id: Uuid) {
        self.tokens.remove(&project_id);
    }
}
