use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::warn;

use crate::error::TransferError;

/// Cooperative cancellation for paced transfers
///
/// Clones share one flag. Blocking wrappers check it at every sleep boundary; async wrappers also
/// race it against the interval sleep so a cancel wakes them immediately.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every transfer observing this handle
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);

            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }

            notified.await;
        }
    }
}

/// Every cancelled transfer ends here, whichever boundary caught it
fn cancelled_at(transferred: usize) -> TransferError {
    warn!("Paced transfer cancelled after {transferred} bytes");
    TransferError::Cancelled { transferred }
}

/// Fail with [`TransferError::Cancelled`] if `cancel` has fired
#[inline]
pub(crate) fn check(cancel: Option<&CancelHandle>, transferred: usize) -> Result<(), TransferError> {
    match cancel {
        Some(handle) if handle.is_cancelled() => Err(cancelled_at(transferred)),
        _ => Ok(()),
    }
}

/// Async interval sleep that ends early, with [`TransferError::Cancelled`], once `cancel` fires
pub(crate) async fn sleep_unless_cancelled(delay: Duration, cancel: Option<&CancelHandle>, transferred: usize) -> Result<(), TransferError> {
    let Some(handle) = cancel else {
        tokio::time::sleep(delay).await;
        return Ok(());
    };

    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        _ = handle.cancelled() => Err(cancelled_at(transferred)),
    }
}
