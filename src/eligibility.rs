//! Eligibility oracle (C5). Pure, takes a store snapshot and a clock.

use crate::schema::{sanitize_timestamp, AuthProfileStore, ProfileUsageStats};

/// The maximum of whichever of `cooldown_until`, `disabled_until`, and
/// `model_stats[model_id].cooldown_until` are present, finite, and
/// strictly positive. `None` means eligible now.
pub fn resolve_unusable_until(stats: &ProfileUsageStats, model_id: Option<&str>) -> Option<i64> {
    let mut candidates = vec![stats.cooldown_until, stats.disabled_until];

    if let Some(model_id) = model_id {
        if let Some(model_stats) = stats.model_stats.as_ref().and_then(|m| m.get(model_id)) {
            candidates.push(model_stats.cooldown_until);
        }
    }

    candidates
        .into_iter()
        .filter_map(sanitize_timestamp)
        .max()
}

pub fn is_in_cooldown(store: &AuthProfileStore, profile_id: &str, model_id: Option<&str>, now: i64) -> bool {
    let stats = store.stats_for(profile_id);
    match resolve_unusable_until(&stats, model_id) {
        Some(until) => until > now,
        None => false,
    }
}

/// The smallest positive wait among `candidates`, or 0 if any candidate is
/// already eligible. Used by the retry driver (C7) to size its cooldown
/// sleep across a list of alternative profiles for the same model.
pub fn min_eligible_wait(
    store: &AuthProfileStore,
    candidates: &[String],
    model_id: &str,
    now: i64,
) -> u64 {
    let mut min_wait: Option<u64> = None;
    for profile_id in candidates {
        let stats = store.stats_for(profile_id);
        match resolve_unusable_until(&stats, Some(model_id)) {
            None => return 0,
            Some(until) if until <= now => return 0,
            Some(until) => {
                let wait = (until - now) as u64;
                min_wait = Some(min_wait.map_or(wait, |m| m.min(wait)));
            }
        }
    }
    min_wait.unwrap_or(0)
}
