//! Cooldown duration calculation (C2). Pure functions, no shared state.

use crate::config::CooldownConfig;

const MINUTE_MS: f64 = 60_000.0;
const HOUR_MS: f64 = 3_600_000.0;

/// Backoff for rate-limit/timeout failures:
/// `min(1h, 60_000 * 5^min(n-1,3))` ms.
///
/// `n` is the 1-indexed consecutive-failure count; `n <= 0` is treated as
/// `n = 1`. Sequence for n = 1..5: 60s, 300s, 1500s, 3600s, 3600s.
pub fn rate_limit_backoff_ms(n: i64) -> u64 {
    let n = n.max(1);
    let exponent = (n - 1).min(3) as i32;
    let raw = MINUTE_MS * 5f64.powi(exponent);
    raw.min(HOUR_MS) as u64
}

/// Backoff for billing failures:
/// `min(max_ms, max(60_000, base_ms) * 2^min(n-1,10))`.
///
/// `base_ms`/`max_ms` come from `CooldownConfig`, already validated against
/// defaults. `n <= 0` is treated as `n = 1`.
pub fn billing_backoff_ms(n: i64, provider: &str, cfg: &CooldownConfig) -> u64 {
    let n = n.max(1);
    let exponent = (n - 1).min(10) as i32;
    let base_ms = cfg.billing_base_ms_for(provider);
    let max_ms = cfg.billing_max_ms();
    let raw = base_ms.max(MINUTE_MS) * 2f64.powi(exponent);
    raw.min(max_ms) as u64
}
