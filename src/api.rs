//! Public surface (C6): the four entry points callers actually invoke,
//! composing the locked store (C4) with the pure usage-stats transformers
//! (C3). A missing profile id is a silent no-op throughout, per spec §7 —
//! this crate never errors on an unrecognized profile.

use crate::clock::Clock;
use crate::config::CooldownConfig;
use crate::error::{FailureReason, StoreResult};
use crate::schema::AuthProfileStore;
use crate::store::Store;
use crate::usage_stats;

/// Record a successful use of `profile_id` (optionally scoped to
/// `model_id`), clearing its cooldown/disabled state. No-op if the
/// profile isn't present in the store.
pub fn mark_used(
    store: &Store,
    clock: &dyn Clock,
    profile_id: &str,
    model_id: Option<&str>,
) -> StoreResult<()> {
    store.update(|s: &mut AuthProfileStore| {
        if !s.has_profile(profile_id) {
            return false;
        }
        let existing = s.stats_for(profile_id);
        let updated = usage_stats::mark_used(&existing, clock.now_ms(), model_id);
        s.set_stats_for(profile_id, updated);
        true
    })?;
    Ok(())
}

/// Record a failure against `profile_id`, applying the cooldown/backoff
/// rules for `reason`. No-op if the profile isn't present in the store.
/// `retry_after_ms`, when supplied, overrides the computed backoff for
/// rate_limit/timeout paths — see `usage_stats::update_stats`. The provider
/// used for billing's per-provider backoff lookup is read from the
/// profile's own stored credential, never taken from the caller — there is
/// no way to mis-apply another provider's override by passing the wrong
/// string.
pub fn mark_failure(
    store: &Store,
    clock: &dyn Clock,
    profile_id: &str,
    reason: FailureReason,
    model_id: Option<&str>,
    retry_after_ms: Option<u64>,
    cfg: &CooldownConfig,
) -> StoreResult<()> {
    store.update(|s: &mut AuthProfileStore| {
        if !s.has_profile(profile_id) {
            return false;
        }
        let provider = s
            .profiles
            .get(profile_id)
            .and_then(|c| c.provider())
            .unwrap_or("unknown")
            .to_string();
        let existing = s.stats_for(profile_id);
        let updated = usage_stats::update_stats(
            &existing,
            clock.now_ms(),
            &provider,
            reason,
            cfg,
            model_id,
            retry_after_ms,
        );
        s.set_stats_for(profile_id, updated);
        true
    })?;
    Ok(())
}

/// Convenience alias for `mark_failure` with `reason = RateLimit` —
/// the common case of a provider signaling "slow down" without a more
/// specific classification.
pub fn mark_cooldown(
    store: &Store,
    clock: &dyn Clock,
    profile_id: &str,
    model_id: Option<&str>,
    retry_after_ms: Option<u64>,
    cfg: &CooldownConfig,
) -> StoreResult<()> {
    mark_failure(
        store,
        clock,
        profile_id,
        FailureReason::RateLimit,
        model_id,
        retry_after_ms,
        cfg,
    )
}

/// Manually clear a profile's cooldown state. See DESIGN.md Open
/// Question 1 for what "clear" does and does not touch. No-op if the
/// profile isn't present in the store.
pub fn clear_cooldown(
    store: &Store,
    profile_id: &str,
    model_id: Option<&str>,
) -> StoreResult<()> {
    store.update(|s: &mut AuthProfileStore| {
        if !s.has_profile(profile_id) {
            return false;
        }
        let existing = s.stats_for(profile_id);
        let updated = usage_stats::clear_cooldown(&existing, model_id);
        s.set_stats_for(profile_id, updated);
        true
    })?;
    Ok(())
}
