//! Reconnect-and-retry around the scheduler
//!
//! Three fault classes are treated as a sign the connection went bad: peer
//! reset, read timeout, and a body that failed content decoding. Each gets
//! one reconnect and one retry per call; the same class failing again is
//! raised. Plain connection errors are retried up to a configurable ceiling
//! (0 = unlimited), reconnecting before each attempt. A reconnect that fails
//! is raised.
//!
//! REST callers use [`Recovery::execute_buffered`], which reads the body
//! inside the retry loop: decoding errors and read timeouts mostly arrive
//! with the body, not with the response head.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{error, warn};
use transport::{ApiRequest, ApiResponse, Fault};

use crate::error::{Error, Result};
use crate::metrics;
use crate::options::{NotFound, RequestOptions};
use crate::scheduler::Scheduler;

pub struct Recovery {
    scheduler: Scheduler,
    /// 0 = unlimited.
    connection_errors: u32,
    not_found_delay: Duration,
}

impl Recovery {
    pub fn new(scheduler: Scheduler, connection_errors: u32, not_found_delay: Duration) -> Self {
        Self {
            scheduler,
            connection_errors,
            not_found_delay,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run a request, returning once the response head arrives. The body is
    /// left for the caller to read.
    pub async fn execute(
        &mut self,
        request: &ApiRequest,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        self.run(request, options, false).await
    }

    /// Run a request and read its whole body before returning.
    pub async fn execute_buffered(
        &mut self,
        request: &ApiRequest,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        self.run(request, options, true).await
    }

    async fn run(
        &mut self,
        request: &ApiRequest,
        options: RequestOptions,
        buffer: bool,
    ) -> Result<ApiResponse> {
        let mut retried: HashSet<Fault> = HashSet::new();
        let mut connection_errors = 0u32;
        let mut not_found_retried = false;

        loop {
            let attempt = match self.scheduler.execute(request, options).await {
                Ok(response) if buffer => response.buffered().await.map_err(Error::from),
                other => other,
            };
            let err = match attempt {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            match err.fault() {
                Some(fault @ (Fault::ConnectionReset | Fault::Timeout | Fault::Decode)) => {
                    if !retried.insert(fault) {
                        error!(fault = fault.label(), error = %err, "fault repeated after reconnect");
                        return Err(err);
                    }
                    warn!(fault = fault.label(), error = %err, "caught transient fault, reconnecting");
                    self.reconnect(fault)?;
                }
                Some(Fault::Connect) => {
                    connection_errors += 1;
                    error!(error = %err, attempt = connection_errors, "caught connection error");
                    if self.connection_errors != 0 && connection_errors >= self.connection_errors {
                        error!("received too many connection errors");
                        return Err(err);
                    }
                    self.reconnect(Fault::Connect)?;
                }
                _ if err.status() == Some(404)
                    && options.not_found == NotFound::Retry
                    && !not_found_retried =>
                {
                    not_found_retried = true;
                    warn!(url = %request.url, "404 from API, trying again");
                    tokio::time::sleep(self.not_found_delay).await;
                }
                _ => return Err(err),
            }
        }
    }

    pub fn close(&mut self) {
        self.scheduler.close();
    }

    fn reconnect(&mut self, fault: Fault) -> Result<()> {
        metrics::record_reconnect(fault.label());
        self.scheduler.reconnect().inspect_err(|err| {
            error!(fault = fault.label(), error = %err, "reconnect failed");
        })
    }
}
