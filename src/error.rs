//! Error types for the auth failover core.
//!
//! Uses `thiserror` for ergonomic `Display`/`Error` derivation. No variant
//! carries secret material (API keys, tokens) in its message.

use thiserror::Error;

/// The closed set of failure reasons a caller can classify an upstream
/// error into. `markFailure` and the usage-stats updater only ever see one
/// of these six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Auth,
    Format,
    RateLimit,
    Billing,
    Timeout,
    Unknown,
}

impl FailureReason {
    /// Whether this reason should trigger the infinite-retry driver's
    /// wait-and-retry branch rather than an immediate propagation.
    pub fn triggers_retry(&self) -> bool {
        matches!(self, FailureReason::RateLimit | FailureReason::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Auth => "auth",
            FailureReason::Format => "format",
            FailureReason::RateLimit => "rate_limit",
            FailureReason::Billing => "billing",
            FailureReason::Timeout => "timeout",
            FailureReason::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced by (or on behalf of) an upstream provider call, tagged
/// with one of the closed failure reasons. This is the error shape the
/// retry driver (C7) inspects to decide whether to wait and retry.
#[derive(Error, Debug, Clone)]
#[error("failover error ({reason}): {message}")]
pub struct FailoverError {
    pub reason: FailureReason,
    pub message: String,
}

impl FailoverError {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Errors raised by the locked store (C4) and its callers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to acquire store lock: {0}")]
    Lock(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error raised by the infinite-retry driver when cancellation preempts a
/// pending `execute` call or cooldown sleep. Distinguishable from a
/// cancellation that occurs while waiting out a cooldown, per spec's
/// "aborted during cooldown wait" requirement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancellationError {
    #[error("task aborted")]
    Aborted,
    #[error("aborted during cooldown wait")]
    AbortedDuringCooldownWait,
}

/// The error a call to `run_with_failover` can resolve to: either the
/// caller's own execute error (propagated untouched), or a cancellation.
#[derive(Error, Debug)]
pub enum DriverError<E> {
    #[error(transparent)]
    Execute(E),
    #[error(transparent)]
    Cancelled(#[from] CancellationError),
}
