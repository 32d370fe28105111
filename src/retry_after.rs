//! Retry-After extraction (C1).
//!
//! Pure, total, no I/O: parses a delay hint out of a caller-provided
//! error-like value. The actual error object's shape belongs to the
//! caller; this crate only needs the handful of fields it might carry.

use std::collections::HashMap;

use crate::clock::Clock;

/// What a caller can tell us about a failed call's error object, without
/// this crate needing to know the object's concrete type.
#[derive(Debug, Clone, Default)]
pub struct RetryHint {
    /// Response headers, if any. Matched case-insensitively for
    /// `retry-after`.
    pub headers: Option<HashMap<String, String>>,
    /// A direct `retryAfter`/`retry_after` numeric property, in seconds.
    pub retry_after_seconds: Option<f64>,
}

/// Extract a retry delay in milliseconds, following the precedence order:
/// `headers.retry-after` (numeric seconds or HTTP-date) first, then the
/// direct `retryAfter`/`retry_after` property, then `None`.
pub fn extract_retry_after_ms(hint: &RetryHint, clock: &dyn Clock) -> Option<u64> {
    if let Some(headers) = &hint.headers {
        if let Some(raw) = find_case_insensitive(headers, "retry-after") {
            if let Ok(seconds) = raw.trim().parse::<f64>() {
                if seconds >= 0.0 {
                    return Some(seconds_to_ms_ceil(seconds));
                }
            } else if let Some(ms) = parse_http_date_delay_ms(raw, clock) {
                return Some(ms);
            }
        }
    }

    if let Some(seconds) = hint.retry_after_seconds {
        if seconds >= 0.0 {
            return Some(seconds_to_ms_ceil(seconds));
        }
    }

    None
}

fn find_case_insensitive<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn seconds_to_ms_ceil(seconds: f64) -> u64 {
    (seconds * 1000.0).ceil().max(0.0) as u64
}

fn parse_http_date_delay_ms(raw: &str, clock: &dyn Clock) -> Option<u64> {
    let parsed = chrono::DateTime::parse_from_rfc2822(raw.trim()).ok()?;
    let target_ms = parsed.timestamp_millis();
    let now_ms = clock.now_ms();
    Some((target_ms - now_ms).max(0) as u64)
}
