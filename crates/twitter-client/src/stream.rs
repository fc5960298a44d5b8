//! Streaming connection controller
//!
//! `filter` and `sample` hold a long-lived POST open and yield one JSON event
//! per non-empty line. On any disconnect the stream reconnects after a
//! backoff that grows with the number of consecutive errors:
//!
//! - 420/429 on connect: 60s per error
//! - any other HTTP status: 5s per error
//! - anything else (broken body, connection closed): 1s per error
//!
//! The error count drops back to zero once a new connection delivers its
//! first line. Cancellation is polled before each line and once per second
//! while backing off; a cancelled stream ends without reconnecting.

use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use transport::{ApiRequest, TransportError};
use twitter_pool::stream_backoff;
use uuid::Uuid;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::metrics;

/// Parameters for `statuses/filter`.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// Comma-separated phrases.
    pub track: Option<String>,
    /// Comma-separated user ids.
    pub follow: Option<String>,
    /// Bounding boxes, each `sw_lon,sw_lat,ne_lon,ne_lat`.
    pub locations: Vec<String>,
}

impl FilterParams {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(track) = self.track.as_deref().filter(|t| !t.is_empty()) {
            request = request.form("track", track);
        }
        if let Some(follow) = self.follow.as_deref().filter(|f| !f.is_empty()) {
            request = request.form("follow", follow);
        }
        if !self.locations.is_empty() {
            request = request.form("locations", self.locations.join(",").replace('\\', ""));
        }
        request
    }
}

impl Client {
    /// Tweets matching `params`, until cancelled or the error ceiling is hit.
    pub fn filter(
        &mut self,
        params: FilterParams,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Value>> + '_ {
        let request = params.apply(stream_request(self, "statuses/filter.json"));
        events(self, request, cancel, "filter")
    }

    /// The public sample stream, until cancelled or the error ceiling is hit.
    pub fn sample(&mut self, cancel: CancellationToken) -> impl Stream<Item = Result<Value>> + '_ {
        let request = stream_request(self, "statuses/sample.json");
        events(self, request, cancel, "sample")
    }
}

fn stream_request(client: &Client, path: &str) -> ApiRequest {
    ApiRequest::post(client.config().stream_url(path)).form("stall_warnings", "true")
}

/// Why a connection ended.
enum Disconnect {
    Http(Error),
    Failed(Error),
    Closed,
}

impl Disconnect {
    fn from_error(err: Error) -> Self {
        if err.status().is_some() {
            Disconnect::Http(err)
        } else {
            Disconnect::Failed(err)
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Disconnect::Http(_) => "http",
            Disconnect::Failed(_) => "error",
            Disconnect::Closed => "closed",
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Disconnect::Http(err) => err.status(),
            _ => None,
        }
    }

    fn into_error(self) -> Error {
        match self {
            Disconnect::Http(err) | Disconnect::Failed(err) => err,
            Disconnect::Closed => TransportError::Body("stream closed by server".into()).into(),
        }
    }
}

fn events<'a>(
    client: &'a mut Client,
    request: ApiRequest,
    cancel: CancellationToken,
    name: &'static str,
) -> impl Stream<Item = Result<Value>> + 'a {
    let http_errors = client.config().http_errors;

    stream! {
        let mut errors = 0u32;
        loop {
            if cancel.is_cancelled() {
                info!(stream = name, "stream cancelled");
                return;
            }

            let connection_id = Uuid::new_v4();
            let span = info_span!("stream", stream = name, %connection_id);
            info!(parent: &span, url = %request.url, "connecting to stream");

            let disconnect = match client.open_stream(&request).instrument(span.clone()).await {
                Err(err) if err.is_fatal_setup() => {
                    error!(parent: &span, error = %err, "cannot open stream");
                    yield Err(err);
                    return;
                }
                Err(err) => Disconnect::from_error(err),
                Ok(response) => {
                    info!(parent: &span, "connected");
                    let mut lines = response.lines();
                    let mut delivering = false;
                    loop {
                        let line = match lines.next_line().await {
                            Some(Ok(line)) => line,
                            Some(Err(err)) => break Disconnect::Failed(err.into()),
                            None => break Disconnect::Closed,
                        };
                        if cancel.is_cancelled() {
                            info!(parent: &span, "stream cancelled, closing connection");
                            return;
                        }
                        if !delivering {
                            delivering = true;
                            errors = 0;
                        }
                        if line.iter().all(u8::is_ascii_whitespace) {
                            debug!(parent: &span, "keep-alive");
                            continue;
                        }
                        match serde_json::from_slice::<Value>(&line) {
                            Ok(event) => {
                                metrics::record_stream_event();
                                yield Ok(event);
                            }
                            Err(err) => {
                                error!(
                                    parent: &span,
                                    error = %err,
                                    line = %String::from_utf8_lossy(&line),
                                    "json parse error"
                                );
                            }
                        }
                    }
                }
            };

            errors += 1;
            metrics::record_stream_disconnect(disconnect.kind());
            warn!(parent: &span, kind = disconnect.kind(), status = ?disconnect.status(), errors, "stream disconnected");

            if http_errors != 0 && errors >= http_errors {
                error!(parent: &span, errors, "too many stream errors");
                yield Err(disconnect.into_error());
                return;
            }

            let delay = stream_backoff(disconnect.status(), errors);
            warn!(parent: &span, delay_secs = delay.as_secs(), errors, "reconnecting after delay");
            if sleep_unless_cancelled(delay, &cancel).await {
                info!(parent: &span, "stream cancelled during backoff");
                return;
            }
        }
    }
}

/// Sleep in one-second steps, checking `cancel` before each. Returns
/// whether the token was cancelled.
async fn sleep_unless_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    let step = Duration::from_secs(1);
    let mut slept = Duration::ZERO;
    while slept < delay && !cancel.is_cancelled() {
        let nap = step.min(delay - slept);
        tokio::time::sleep(nap).await;
        slept += nap;
    }
    cancel.is_cancelled()
}
