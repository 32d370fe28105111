//! Cooperative cancellation for the infinite-retry driver (C7).
//!
//! An `Arc<AtomicBool>`-backed flag, in the spirit of a yield-signal: cheap
//! to clone and check, no channel machinery needed for a single boolean.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CancellationError;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), CancellationError> {
        if self.is_cancelled() {
            Err(CancellationError::Aborted)
        } else {
            Ok(())
        }
    }
}

/// Sleep for `duration`, waking early (and returning an error) if `token`
/// is cancelled first. Polls at a bounded interval rather than requiring a
/// dedicated waker, per spec's "polling acceptable if <= 250ms interval"
/// design note.
pub async fn sleep_with_abort(
    duration: Duration,
    token: &CancellationToken,
) -> Result<(), CancellationError> {
    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    let deadline = tokio::time::Instant::now() + duration;
    loop {
        if token.is_cancelled() {
            return Err(CancellationError::AbortedDuringCooldownWait);
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Ok(());
        }
        let remaining = deadline - now;
        tokio::time::sleep(remaining.min(POLL_INTERVAL)).await;
    }
}
