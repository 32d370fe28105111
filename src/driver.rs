//! Infinite-retry driver (C7).
//!
//! Adapted from the teacher's `RetryProvider` (a bounded, builder-configured
//! retry wrapper around an async call) into spec.md's unbounded loop: no
//! retry budget, terminated only by success, cancellation, or a
//! non-qualifying error.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::cancellation::{sleep_with_abort, CancellationToken};
use crate::clock::Clock;
use crate::eligibility::min_eligible_wait;
use crate::error::{DriverError, FailoverError};
use crate::schema::AuthProfileStore;

/// Context passed to `on_quota_exhaustion` right before each cooldown
/// sleep.
#[derive(Debug, Clone)]
pub struct QuotaExhaustion<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub wait_ms: u64,
    pub attempt: u32,
}

/// Optional inputs that let the driver compute a tighter wait than the
/// 60-second default: a store snapshot, the candidate profile ids for this
/// model, and the model id itself. All three must be present together.
pub struct FailoverContext<'a> {
    pub store: &'a AuthProfileStore,
    pub candidates: &'a [String],
    pub model_id: &'a str,
    pub provider: &'a str,
    pub clock: &'a dyn Clock,
}

const DEFAULT_WAIT_MS: u64 = 60_000;

/// Run `execute` in an unbounded retry loop. On a `RateLimit`/`Timeout`
/// failover error, sleeps (aborting early on cancellation) and retries.
/// Any other error propagates immediately. There is no retry budget —
/// callers wanting one wrap this driver with their own counter.
pub async fn run_with_failover<F, Fut, T, E>(
    token: &CancellationToken,
    mut execute: F,
    failover_ctx: Option<FailoverContext<'_>>,
    on_quota_exhaustion: Option<&dyn Fn(QuotaExhaustion<'_>)>,
) -> Result<T, DriverError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: TryAsFailoverError,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        token.check()?;

        match execute().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                token.check()?;

                let Some(failover) = err.as_failover_error() else {
                    return Err(DriverError::Execute(err));
                };
                if !failover.reason.triggers_retry() {
                    return Err(DriverError::Execute(err));
                }

                let wait_ms = match &failover_ctx {
                    Some(ctx) => min_eligible_wait(ctx.store, ctx.candidates, ctx.model_id, ctx.clock.now_ms()),
                    None => DEFAULT_WAIT_MS,
                };

                let provider = failover_ctx.as_ref().map(|c| c.provider).unwrap_or("unknown");
                let model = failover_ctx.as_ref().map(|c| c.model_id).unwrap_or("unknown");

                match on_quota_exhaustion {
                    Some(cb) => cb(QuotaExhaustion {
                        provider,
                        model,
                        wait_ms,
                        attempt,
                    }),
                    None => warn!(provider, model, wait_ms, attempt, "quota exhausted, waiting"),
                }

                sleep_with_abort(Duration::from_millis(wait_ms), token).await?;
            }
        }
    }
}

/// Lets the driver recognize a `FailoverError` inside an arbitrary caller
/// error type without requiring every caller to use `FailoverError`
/// directly as `E`.
pub trait TryAsFailoverError {
    fn as_failover_error(&self) -> Option<&FailoverError>;
}

impl TryAsFailoverError for FailoverError {
    fn as_failover_error(&self) -> Option<&FailoverError> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureReason;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    // E7: execute fails once with rate_limit, then succeeds; single
    // candidate in a 2s cooldown. Driver waits ~2s then returns success on
    // attempt 2.
    #[tokio::test]
    async fn e7_waits_out_cooldown_then_succeeds() {
        let token = CancellationToken::new();
        let attempts = Arc::new(AtomicU32::new(0));

        let store = {
            let mut s = AuthProfileStore::default();
            s.set_stats_for(
                "p1",
                crate::schema::ProfileUsageStats {
                    model_stats: Some(
                        [(
                            "opus".to_string(),
                            crate::schema::ModelUsageStats {
                                cooldown_until: Some(2_000),
                                ..Default::default()
                            },
                        )]
                        .into_iter()
                        .collect(),
                    ),
                    ..Default::default()
                },
            );
            s
        };
        let clock = crate::clock::FixedClock::new(0);
        let candidates = vec!["p1".to_string()];
        let ctx = FailoverContext {
            store: &store,
            candidates: &candidates,
            model_id: "opus",
            provider: "anthropic",
            clock: &clock,
        };

        let attempts_clone = Arc::clone(&attempts);
        let result = run_with_failover(
            &token,
            move || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        Err(FailoverError::new(FailureReason::RateLimit, "429"))
                    } else {
                        Ok::<_, FailoverError>("ok")
                    }
                }
            },
            Some(ctx),
            None,
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    // E8: as E7, but cancellation fires during the sleep. Driver raises a
    // cancellation error and never calls execute again.
    #[tokio::test]
    async fn e8_cancellation_during_sleep_stops_the_loop() {
        let token = CancellationToken::new();
        let attempts = Arc::new(AtomicU32::new(0));

        let token_clone = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token_clone.cancel();
        });

        let attempts_clone = Arc::clone(&attempts);
        let result: Result<&str, DriverError<FailoverError>> = run_with_failover(
            &token,
            move || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(FailoverError::new(FailureReason::RateLimit, "429"))
                }
            },
            None,
            None,
        )
        .await;

        assert!(matches!(result, Err(DriverError::Cancelled(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_qualifying_error_propagates_immediately() {
        let token = CancellationToken::new();
        let result: Result<&str, DriverError<FailoverError>> = run_with_failover(
            &token,
            || async { Err(FailoverError::new(FailureReason::Auth, "bad key")) },
            None,
            None,
        )
        .await;
        assert!(matches!(
            result,
            Err(DriverError::Execute(FailoverError {
                reason: FailureReason::Auth,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn on_quota_exhaustion_callback_is_invoked() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let callback = move |exhaustion: QuotaExhaustion<'_>| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(exhaustion.wait_ms, 60_000);
        };

        let result: Result<&str, DriverError<FailoverError>> = run_with_failover(
            &token,
            move || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        Err(FailoverError::new(FailureReason::Timeout, "timed out"))
                    } else {
                        Ok("ok")
                    }
                }
            },
            None,
            Some(&callback),
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
