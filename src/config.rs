//! The cooldown configuration subset (`auth.cooldowns.*`).
//!
//! Mirrors the teacher's `Config` struct shape (serde-derived, sensible
//! defaults, tolerant of partial JSON) but trimmed to only the fields this
//! crate's cooldown calculator (C2) needs. Loading the embedding
//! application's full config file is that application's concern — this
//! crate only defines the subset and its validation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

const HOUR_MS: f64 = 3_600_000.0;

/// `auth.cooldowns` — billing backoff parameters, with optional
/// per-provider overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownConfig {
    #[serde(default = "default_billing_backoff_hours")]
    pub billing_backoff_hours: f64,
    #[serde(default = "default_billing_max_hours")]
    pub billing_max_hours: f64,
    #[serde(default = "default_failure_window_hours")]
    pub failure_window_hours: f64,
    #[serde(default)]
    pub billing_backoff_hours_by_provider: HashMap<String, f64>,
}

fn default_billing_backoff_hours() -> f64 {
    5.0
}
fn default_billing_max_hours() -> f64 {
    24.0
}
fn default_failure_window_hours() -> f64 {
    24.0
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            billing_backoff_hours: default_billing_backoff_hours(),
            billing_max_hours: default_billing_max_hours(),
            failure_window_hours: default_failure_window_hours(),
            billing_backoff_hours_by_provider: HashMap::new(),
        }
    }
}

/// Returns `value` if it is positive and finite, else `fallback`. This is
/// the validation rule applied to every overridable numeric field: an
/// invalid override falls through to the default rather than erroring.
fn valid_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

impl CooldownConfig {
    /// The effective base billing backoff in milliseconds for `provider`,
    /// honoring the per-provider override table when present and valid.
    pub fn billing_base_ms_for(&self, provider: &str) -> f64 {
        let default_hours = valid_or(self.billing_backoff_hours, default_billing_backoff_hours());
        let normalized = normalize(provider);
        let hours = self
            .billing_backoff_hours_by_provider
            .iter()
            .find(|(key, _)| normalize(key) == normalized)
            .map(|(_, hours)| valid_or(*hours, default_hours))
            .unwrap_or(default_hours);
        hours * HOUR_MS
    }

    pub fn billing_max_ms(&self) -> f64 {
        valid_or(self.billing_max_hours, default_billing_max_hours()) * HOUR_MS
    }

    pub fn failure_window_ms(&self) -> f64 {
        valid_or(self.failure_window_hours, default_failure_window_hours()) * HOUR_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CooldownConfig::default();
        assert_eq!(cfg.billing_base_ms_for("anthropic"), 5.0 * HOUR_MS);
        assert_eq!(cfg.billing_max_ms(), 24.0 * HOUR_MS);
        assert_eq!(cfg.failure_window_ms(), 24.0 * HOUR_MS);
    }

    #[test]
    fn invalid_override_falls_back_to_default() {
        let mut cfg = CooldownConfig {
            billing_backoff_hours: -1.0,
            billing_max_hours: f64::NAN,
            failure_window_hours: 0.0,
            ..Default::default()
        };
        cfg.billing_backoff_hours_by_provider
            .insert("openai".into(), -5.0);
        assert_eq!(cfg.billing_base_ms_for("openai"), 5.0 * HOUR_MS);
        assert_eq!(cfg.billing_max_ms(), 24.0 * HOUR_MS);
        assert_eq!(cfg.failure_window_ms(), 24.0 * HOUR_MS);
    }

    #[test]
    fn per_provider_override_is_normalized() {
        let mut cfg = CooldownConfig::default();
        cfg.billing_backoff_hours_by_provider
            .insert("Anthropic".into(), 10.0);
        assert_eq!(cfg.billing_base_ms_for("anthropic"), 10.0 * HOUR_MS);
        assert_eq!(cfg.billing_base_ms_for("ANTHROPIC"), 10.0 * HOUR_MS);
        assert_eq!(cfg.billing_base_ms_for("openai"), 5.0 * HOUR_MS);
    }

    #[test]
    fn partial_json_applies_defaults() {
        let cfg: CooldownConfig = serde_json::from_str(r#"{"billingMaxHours": 48}"#).unwrap();
        assert_eq!(cfg.billing_max_hours, 48.0);
        assert_eq!(cfg.billing_backoff_hours, 5.0);
    }
}
