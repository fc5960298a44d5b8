//! Per-call request policy
//!
//! Some endpoints legitimately answer 404 for a user or region that does not
//! exist, while others have been seen to return a spurious 404 that succeeds
//! on retry. The caller decides which applies.

/// What to do with a 404 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFound {
    /// Retry once after a short delay, then raise.
    #[default]
    Retry,
    /// Raise immediately.
    Allow,
}

/// What to do with a 5xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerErrors {
    /// Back off and retry on the same credential up to the ceiling.
    #[default]
    Retry,
    /// Raise immediately so the caller can apply its own backoff.
    Surface,
}

/// What to do with a 429 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimits {
    /// Mark the credential and move on, sleeping if every credential is
    /// throttled.
    #[default]
    Wait,
    /// Raise immediately, leaving the credential usable.
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOptions {
    pub not_found: NotFound,
    pub server_errors: ServerErrors,
    pub rate_limits: RateLimits,
}

impl RequestOptions {
    /// Treat 404 as a real answer rather than a glitch.
    pub fn allow_not_found() -> Self {
        Self {
            not_found: NotFound::Allow,
            ..Self::default()
        }
    }

    /// Policy for opening a streaming connection: every HTTP error is
    /// handed to the stream's own reconnect loop.
    pub fn streaming() -> Self {
        Self {
            not_found: NotFound::Allow,
            server_errors: ServerErrors::Surface,
            rate_limits: RateLimits::Surface,
        }
    }
}
