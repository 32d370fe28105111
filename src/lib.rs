//! Credential failover core: cooldown tracking, locked persistent usage
//! stats, and an infinite-retry driver for a fleet of provider credentials.

pub mod api;
pub mod cancellation;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod driver;
pub mod error;
pub mod error_classifier;
pub mod eligibility;
pub mod logging;
pub mod normalize;
pub mod retry_after;
pub mod schema;
pub mod store;
pub mod usage_stats;

pub use api::{clear_cooldown, mark_cooldown, mark_failure, mark_used};
pub use cancellation::{sleep_with_abort, CancellationToken};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CooldownConfig;
pub use cooldown::{billing_backoff_ms, rate_limit_backoff_ms};
pub use driver::{run_with_failover, FailoverContext, QuotaExhaustion, TryAsFailoverError};
pub use eligibility::{is_in_cooldown, min_eligible_wait, resolve_unusable_until};
pub use error::{CancellationError, DriverError, FailoverError, FailureReason, StoreError, StoreResult};
pub use error_classifier::classify_provider_error;
pub use logging::{init_tracing, LogFormat, LoggingConfig};
pub use normalize::normalize;
pub use retry_after::{extract_retry_after_ms, RetryHint};
pub use schema::{
    AgentId, AuthProfileStore, CredentialVariant, ModelId, ModelUsageStats, ProfileId,
    ProfileUsageStats, RoutingKey,
};
pub use store::Store;
