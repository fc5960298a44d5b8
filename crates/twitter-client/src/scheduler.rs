//! Credential selection and rate-limit scheduling
//!
//! Every request goes through `Scheduler::execute`, which picks the
//! lowest-index credential that is not throttled, runs the request on the
//! session for that credential and interprets the status:
//!
//! - 2xx: returned.
//! - 429: the credential is marked unusable until the reset in the
//!   `x-rate-limit-reset` header, and selection starts over. Callers that
//!   run their own backoff can have it raised instead.
//! - 5xx: retried on the same credential after `backoff * n`, up to the
//!   ceiling; past it the status is raised.
//! - anything else: raised.
//!
//! When every credential is throttled the call sleeps until the earliest
//! reset plus a fixed slack. Waiting is never an error.

use std::time::Duration;

use tracing::{debug, error, warn};
use transport::{ApiRequest, ApiResponse};
use twitter_pool::{
    Clock, CredentialPool, RATE_LIMIT_RESET_HEADER, Selection, StatusClass, classify_status,
    reset_at,
};

use crate::error::{Error, Result};
use crate::metrics;
use crate::options::{RateLimits, RequestOptions, ServerErrors};
use crate::session::SessionManager;

/// Timing and ceilings applied by the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerPolicy {
    pub slack: Duration,
    pub server_error_ceiling: u32,
    pub server_error_backoff: Duration,
    pub rate_limit_fallback: Duration,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            slack: Duration::from_secs(10),
            server_error_ceiling: 30,
            server_error_backoff: Duration::from_secs(60),
            rate_limit_fallback: Duration::from_secs(900),
        }
    }
}

pub struct Scheduler {
    pool: CredentialPool,
    sessions: SessionManager,
    clock: Clock,
    policy: SchedulerPolicy,
}

impl Scheduler {
    pub fn new(
        pool: CredentialPool,
        sessions: SessionManager,
        clock: Clock,
        policy: SchedulerPolicy,
    ) -> Self {
        Self {
            pool,
            sessions,
            clock,
            policy,
        }
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Index of the credential currently bound to the session.
    pub fn active(&self) -> Option<usize> {
        self.sessions.active()
    }

    /// Run a request until it succeeds or fails for good.
    pub async fn execute(
        &mut self,
        request: &ApiRequest,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let mut errors = 0u32;
        loop {
            let index = self.acquire().await?;
            loop {
                let response = self.sessions.execute(request).await?;
                let status = response.status();
                metrics::record_request(request.method.as_str(), status);

                match classify_status(status) {
                    StatusClass::Success => return Ok(response),
                    StatusClass::RateLimited if options.rate_limits == RateLimits::Surface => {
                        metrics::record_rate_limited(index);
                        warn!(credential = index, "rate limited, raising to caller");
                        return Err(http_error(response).await);
                    }
                    StatusClass::RateLimited => {
                        let until = reset_at(
                            response.header(RATE_LIMIT_RESET_HEADER),
                            &self.clock,
                            self.policy.rate_limit_fallback,
                        );
                        drop(response);
                        self.pool.mark_rate_limited(index, until)?;
                        metrics::record_rate_limited(index);
                        warn!(
                            credential = index,
                            reset_in_secs = until.saturating_duration_since(self.clock.now()).as_secs(),
                            "rate limited, selecting another credential"
                        );
                        break;
                    }
                    StatusClass::ServerError if options.server_errors == ServerErrors::Retry => {
                        errors += 1;
                        metrics::record_server_error(status);
                        if errors > self.policy.server_error_ceiling {
                            error!(status, errors, "too many server errors, giving up");
                            return Err(http_error(response).await);
                        }
                        drop(response);
                        let wait = self.policy.server_error_backoff * errors;
                        warn!(status, errors, wait_secs = wait.as_secs(), "server error, backing off");
                        tokio::time::sleep(wait).await;
                    }
                    _ => return Err(http_error(response).await),
                }
            }
        }
    }

    /// Bind the session to the active credential again.
    ///
    /// Does nothing before the first selection; the next request connects.
    pub fn reconnect(&mut self) -> Result<()> {
        match self.sessions.active() {
            Some(index) => {
                let credential = self.pool.credential(index)?;
                self.sessions.reconnect(credential)
            }
            None => Ok(()),
        }
    }

    pub fn close(&mut self) {
        self.sessions.close();
    }

    /// Select a credential, sleeping while all are throttled, and make it
    /// the active one.
    async fn acquire(&mut self) -> Result<usize> {
        loop {
            let now = self.clock.now();
            match self.pool.select(now, self.policy.slack) {
                Selection::Ready(index) => {
                    let credential = self.pool.credential(index)?;
                    self.sessions.activate(index, credential)?;
                    return Ok(index);
                }
                Selection::Wait(wait) => {
                    warn!(
                        credentials = self.pool.len(),
                        wait_secs = wait.as_secs(),
                        pool = %self.pool.health(now),
                        "all credentials rate limited, sleeping"
                    );
                    tokio::time::sleep(wait).await;
                    debug!("woke up, selecting credential");
                }
            }
        }
    }
}

/// Turn an unaccepted response into an error carrying its status and body.
pub(crate) async fn http_error(response: ApiResponse) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Error::Http { status, body }
}
