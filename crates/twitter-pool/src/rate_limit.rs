//! Rate-limit detection for Twitter API responses
//!
//! REST endpoints signal throttling with 429 plus an `x-rate-limit-reset`
//! header holding the absolute Unix second at which the window reopens.
//! Streaming endpoints still use the legacy 420 code as well, and back off on
//! a different schedule than the REST scheduler.

use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::clock::Clock;

/// Header carrying the absolute reset time (Unix seconds).
pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

/// How the scheduler treats a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 429
    RateLimited,
    /// 404
    NotFound,
    /// 5xx
    ServerError,
    /// Anything else: raised to the caller unretried.
    Fatal,
}

/// Classify a REST response status.
///
/// Only 429 is a rate limit here; 420 is a streaming-only code and is fatal
/// on REST endpoints.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 => StatusClass::RateLimited,
        404 => StatusClass::NotFound,
        500.. => StatusClass::ServerError,
        _ => StatusClass::Fatal,
    }
}

/// Parse a reset header value as Unix seconds.
///
/// Fractional values are truncated. Anything else is rejected.
pub fn parse_reset(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs as u64)
}

/// Instant at which a throttled credential becomes usable again.
///
/// Falls back to `now + fallback` when the header is missing or malformed.
pub fn reset_at(header: Option<&str>, clock: &Clock, fallback: Duration) -> Instant {
    match header.and_then(parse_reset) {
        Some(secs) => clock.instant_at(secs),
        None => {
            warn!(
                header = header.unwrap_or(""),
                fallback_secs = fallback.as_secs(),
                "rate-limit reset header missing or invalid, using fallback window"
            );
            clock.now() + fallback
        }
    }
}

/// Whether a streaming status means "rate limited" (420 or 429).
pub fn is_stream_rate_limited(status: u16) -> bool {
    matches!(status, 420 | 429)
}

/// Delay before the next streaming reconnect.
///
/// `status` is `None` for non-HTTP failures. `errors` is the consecutive
/// error count including the failure being handled.
pub fn stream_backoff(status: Option<u16>, errors: u32) -> Duration {
    let per_error = match status {
        Some(code) if is_stream_rate_limited(code) => 60,
        Some(_) => 5,
        None => 1,
    };
    Duration::from_secs(per_error * u64::from(errors))
}
