//! A cloneable handle for poking the chat from external code.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for cancelling or awaiting the in-flight query.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct ChatHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
    pub(crate) is_running: Arc<AtomicBool>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Abort the in-flight query, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Claim the single session slot. Returns `None` while another session
    /// holds it. The slot is released when the guard drops.
    pub(crate) fn try_start(&self) -> Option<RunGuard> {
        self.is_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        Some(RunGuard {
            handle: self.clone(),
            token,
        })
    }

    /// Wait until the chat becomes idle.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_running.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    /// Wait until the chat becomes idle, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_running.load(Ordering::Acquire) {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }

    /// Whether a query session is in flight.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }
}

/// Holds the session slot for one submission
pub(crate) struct RunGuard {
    handle: ChatHandle,
    token: CancellationToken,
}

impl RunGuard {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.handle.is_running.store(false, Ordering::Release);
        self.handle.idle_notify.notify_waiters();
    }
}
