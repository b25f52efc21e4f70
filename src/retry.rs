//! Retry classification and backoff.
//!
//! A fixed `2^(attempt-1)` schedule with no jitter: the only testable
//! property is a *lower* bound on sleep duration ("sleeps >= {2, 4, 8}s"),
//! and a deterministic schedule keeps tests fast and exact — see
//! DESIGN.md.

use std::time::Duration;

pub const SEND_RETRIES: u32 = 4;
pub const SEND_SLEEPING_BACKOFF: Duration = Duration::from_secs(2);

/// The sentinel status this crate's transport layer returns for DNS/connect/
/// TLS/timeout failures, since there is no real HTTP status for them.
pub const TRANSPORT_ERROR_STATUS: i32 = -1;

/// Non-retriable 4xx (bad token/url/request), retriable everything else
/// (5xx, unknown, transport failure).
pub fn should_retry(status: i32) -> bool {
    !matches!(status, 200 | 400 | 401 | 403 | 404)
}

/// Backoff sleep before attempt `attempt` (1-indexed: there is no sleep
/// before attempt 1). `backoff_before_attempt(2) == 2s`,
/// `backoff_before_attempt(3) == 4s`, `backoff_before_attempt(4) == 8s`.
pub fn backoff_before_attempt(attempt: u32) -> Duration {
    debug_assert!(attempt >= 2);
    SEND_SLEEPING_BACKOFF * 2u32.pow(attempt - 2)
}
