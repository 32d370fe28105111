//! Usage-stats updater (C3). Pure transformations over `ProfileUsageStats`.

use crate::config::CooldownConfig;
use crate::cooldown::{billing_backoff_ms, rate_limit_backoff_ms};
use crate::error::FailureReason;
use crate::normalize::normalize;
use crate::schema::{sanitize_timestamp, ModelUsageStats, ProfileUsageStats};

/// `now - last_failure_at > failure_window_ms`, treating an absent
/// `last_failure_at` as "expired" (nothing to expire).
fn window_expired(last_failure_at: Option<i64>, now: i64, failure_window_ms: f64) -> bool {
    match sanitize_timestamp(last_failure_at) {
        Some(t) => (now - t) as f64 > failure_window_ms,
        None => true,
    }
}

/// Apply a failure to `existing`, returning the new stats. `retry_after_ms`,
/// when supplied, overrides the computed backoff for the rate_limit/timeout
/// paths (both model-scoped and profile-wide) — it never affects billing,
/// which has its own escalation curve.
pub fn update_stats(
    existing: &ProfileUsageStats,
    now: i64,
    provider: &str,
    reason: FailureReason,
    cfg: &CooldownConfig,
    model_id: Option<&str>,
    retry_after_ms: Option<u64>,
) -> ProfileUsageStats {
    let mut stats = existing.clone();

    if reason == FailureReason::Billing {
        let prior = stats
            .failure_counts
            .as_ref()
            .and_then(|m| m.get("billing"))
            .copied()
            .unwrap_or(0);
        let expired = window_expired(stats.last_failure_at, now, cfg.failure_window_ms());
        let count = if expired { 1 } else { prior + 1 };

        let backoff = billing_backoff_ms(count as i64, provider, cfg);
        stats.disabled_until = Some(now + backoff as i64);
        stats.disabled_reason = Some("billing".to_string());
        stats
            .failure_counts
            .get_or_insert_with(std::collections::HashMap::new)
            .insert("billing".to_string(), count);
        stats.last_failure_at = Some(now);
        return stats;
    }

    if let Some(model_id) = model_id {
        if matches!(reason, FailureReason::RateLimit | FailureReason::Timeout) {
            let mut model_stats = stats
                .model_stats
                .as_ref()
                .and_then(|m| m.get(model_id))
                .cloned()
                .unwrap_or_default();

            // Unlike the profile-wide branch below, per-model error counts
            // are not reset by failure-window expiry — spec.md §4.3 step 3
            // bumps unconditionally; only step 4 (profile-wide) is gated.
            let count = model_stats.error_count.unwrap_or(0) + 1;
            let backoff = retry_after_ms.unwrap_or_else(|| rate_limit_backoff_ms(count as i64));

            model_stats.error_count = Some(count);
            model_stats.cooldown_until = Some(now + backoff as i64);
            model_stats.last_failure_at = Some(now);

            stats
                .model_stats
                .get_or_insert_with(std::collections::HashMap::new)
                .insert(model_id.to_string(), model_stats);
            return stats;
        }
    }

    // Profile-wide penalty (auth, format, unknown, or rate_limit/timeout
    // without a model id).
    let expired = window_expired(stats.last_failure_at, now, cfg.failure_window_ms());
    let count = if expired { 1 } else { stats.error_count.unwrap_or(0) + 1 };
    let backoff = retry_after_ms.unwrap_or_else(|| rate_limit_backoff_ms(count as i64));
    stats.error_count = Some(count);
    stats.cooldown_until = Some(now + backoff as i64);
    stats.last_failure_at = Some(now);
    stats
}

/// Record a successful use, clearing cooldown/disabled state.
pub fn mark_used(existing: &ProfileUsageStats, now: i64, model_id: Option<&str>) -> ProfileUsageStats {
    let mut stats = existing.clone();
    stats.error_count = None;
    stats.cooldown_until = None;
    stats.disabled_until = None;
    stats.disabled_reason = None;
    stats.failure_counts = None;
    stats.last_used = Some(now);

    if let Some(model_id) = model_id {
        if let Some(map) = stats.model_stats.as_mut() {
            if let Some(model_stats) = map.get_mut(model_id) {
                model_stats.error_count = None;
                model_stats.cooldown_until = None;
                model_stats.last_used = Some(now);
            } else {
                map.insert(
                    model_id.to_string(),
                    ModelUsageStats {
                        last_used: Some(now),
                        ..Default::default()
                    },
                );
            }
        } else {
            let mut map = std::collections::HashMap::new();
            map.insert(
                model_id.to_string(),
                ModelUsageStats {
                    last_used: Some(now),
                    ..Default::default()
                },
            );
            stats.model_stats = Some(map);
        }
    }

    stats
}

/// Manual cooldown clear. If `model_id` is given, only that model's
/// cooldown state is cleared. Otherwise clears *only* the profile-wide
/// `error_count`/`cooldown_until` — `disabled_until`, `disabled_reason`,
/// `failure_counts`, and `model_stats` are left untouched. See DESIGN.md
/// Open Question 1.
pub fn clear_cooldown(existing: &ProfileUsageStats, model_id: Option<&str>) -> ProfileUsageStats {
    let mut stats = existing.clone();

    if let Some(model_id) = model_id {
        if let Some(map) = stats.model_stats.as_mut() {
            if let Some(model_stats) = map.get_mut(model_id) {
                model_stats.error_count = None;
                model_stats.cooldown_until = None;
            }
        }
        return stats;
    }

    stats.error_count = None;
    stats.cooldown_until = None;
    stats
}

/// The normalized provider key used when looking up per-provider billing
/// overrides; exposed so callers building stats from a `CredentialVariant`
/// don't need to reach into `crate::normalize` separately.
pub fn normalized_provider(provider: &str) -> String {
    normalize(provider)
}
