//! Pattern-based error classification, grounded on the teacher's
//! `providers::error_classifier`.
//!
//! Checks patterns in priority order: billing > auth > rate_limit >
//! overloaded/timeout > format. Falls back to `Unknown`. The teacher keeps
//! `Overloaded` as its own provider-error variant; this crate's closed
//! six-reason `FailureReason` has no such variant, so an overloaded match
//! folds into `Timeout` (both mean "retry later with backoff").

use crate::error::FailureReason;

pub fn classify_provider_error(message: &str) -> FailureReason {
    let lower = message.to_lowercase();

    if contains_any(
        &lower,
        &[
            "402",
            "payment required",
            "insufficient credits",
            "credit balance",
            "plans & billing",
            "insufficient balance",
            "billing",
        ],
    ) {
        return FailureReason::Billing;
    }

    if contains_any(
        &lower,
        &[
            "invalid_api_key",
            "invalid api key",
            "incorrect api key",
            "invalid token",
            "authentication",
            "re-authenticate",
            "oauth token refresh failed",
            "unauthorized",
            "forbidden",
            "access denied",
            "expired",
            "token has expired",
            "401",
            "403",
            "no credentials found",
            "no api key found",
        ],
    ) {
        return FailureReason::Auth;
    }

    if contains_any(
        &lower,
        &[
            "rate_limit",
            "rate limit",
            "too many requests",
            "429",
            "exceeded your current quota",
            "resource has been exhausted",
            "resource_exhausted",
            "quota exceeded",
            "usage limit",
        ],
    ) {
        return FailureReason::RateLimit;
    }

    if contains_any(
        &lower,
        &["overloaded_error", "\"type\":\"overloaded_error\"", "overloaded"],
    ) {
        return FailureReason::Timeout;
    }

    if contains_any(
        &lower,
        &["timeout", "timed out", "deadline exceeded", "context deadline exceeded"],
    ) {
        return FailureReason::Timeout;
    }

    if contains_any(
        &lower,
        &[
            "string should match pattern",
            "tool_use.id",
            "tool_use_id",
            "messages.1.content.1.tool_use.id",
            "invalid request format",
        ],
    ) {
        return FailureReason::Format;
    }

    FailureReason::Unknown
}

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}
