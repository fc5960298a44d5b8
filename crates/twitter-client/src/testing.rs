//! Scripted in-memory transport for tests
//!
//! A `Script` hands out sessions that replay a shared queue of canned
//! outcomes, and records every request and session lifecycle event across
//! all the sessions created from it.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use futures_util::stream;
use tokio::time::Instant;
use transport::{ApiRequest, ApiResponse, HeaderMap, HeaderValue, Session, TransportError};
use twitter_auth::Credential;

use crate::session::Connect;

/// One canned outcome for the next request.
pub(crate) enum Step {
    Respond {
        status: u16,
        headers: Vec<(&'static str, String)>,
        chunks: Vec<Result<String, TransportError>>,
    },
    Fail(TransportError),
}

impl Step {
    pub fn json(body: impl Into<String>) -> Self {
        Step::Respond {
            status: 200,
            headers: Vec::new(),
            chunks: vec![Ok(body.into())],
        }
    }

    pub fn status(status: u16) -> Self {
        Step::Respond {
            status,
            headers: Vec::new(),
            chunks: vec![Ok(format!("{{\"errors\":[{{\"code\":{status}}}]}}"))],
        }
    }

    pub fn rate_limited(reset_unix: u64) -> Self {
        Step::Respond {
            status: 429,
            headers: vec![("x-rate-limit-reset", reset_unix.to_string())],
            chunks: vec![Ok(r#"{"errors":[{"code":88}]}"#.to_string())],
        }
    }

    /// 200 whose body arrives in the given chunks; an `Err` chunk breaks the body.
    pub fn stream(chunks: Vec<Result<&str, TransportError>>) -> Self {
        Step::Respond {
            status: 200,
            headers: Vec::new(),
            chunks: chunks
                .into_iter()
                .map(|c| c.map(str::to_string))
                .collect(),
        }
    }

    pub fn fail(err: TransportError) -> Self {
        Step::Fail(err)
    }
}

/// A request as the session saw it.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub credential: String,
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub at: Instant,
}

impl Recorded {
    /// Parameter from the query or, failing that, the form body.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .chain(self.form.iter())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct State {
    steps: VecDeque<Step>,
    requests: Vec<Recorded>,
    events: Vec<String>,
    refused_connects: usize,
}

#[derive(Clone, Default)]
pub(crate) struct Script {
    state: Arc<Mutex<State>>,
}

impl Script {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let script = Self::default();
        script.lock().steps.extend(steps);
        script
    }

    pub fn push(&self, step: Step) {
        self.lock().steps.push_back(step);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    /// `connect <consumer_key>` / `close <consumer_key>` /
    /// `refuse <consumer_key>` in order.
    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    /// Fail the next `n` session connects with a connection error.
    pub fn refuse_connects(&self, n: usize) {
        self.lock().refused_connects = n;
    }

    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl Connect for Script {
    fn connect(&self, credential: &Credential) -> Result<Box<dyn Session>, TransportError> {
        let mut state = self.lock();
        if state.refused_connects > 0 {
            state.refused_connects -= 1;
            state.events.push(format!("refuse {}", credential.consumer_key));
            return Err(TransportError::Connect("connection refused".into()));
        }
        state
            .events
            .push(format!("connect {}", credential.consumer_key));
        drop(state);
        Ok(Box::new(ScriptedSession {
            script: self.clone(),
            credential: credential.consumer_key.clone(),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    script: Script,
    credential: String,
    closed: bool,
}

impl Session for ScriptedSession {
    fn execute<'a>(
        &'a mut self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = transport::Result<ApiResponse>> + Send + 'a>> {
        Box::pin(async move {
            let step = {
                let mut state = self.script.lock();
                state.requests.push(Recorded {
                    credential: self.credential.clone(),
                    method: request.method.to_string(),
                    url: request.url.clone(),
                    query: request.query.clone(),
                    form: request.form.clone(),
                    at: Instant::now(),
                });
                state.steps.pop_front()
            };
            match step {
                None => Err(TransportError::Other("script exhausted".into())),
                Some(Step::Fail(err)) => Err(err),
                Some(Step::Respond {
                    status,
                    headers,
                    chunks,
                }) => {
                    let mut map = HeaderMap::new();
                    for (name, value) in headers {
                        map.insert(name, HeaderValue::from_str(&value).unwrap());
                    }
                    let body = stream::iter(chunks.into_iter().map(|c| c.map(Bytes::from)));
                    Ok(ApiResponse::new(status, map, body))
                }
            }
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.script
                .lock()
                .events
                .push(format!("close {}", self.credential));
        }
    }
}

/// `n` complete credentials with consumer keys `ck0`, `ck1`, ...
pub(crate) fn credentials(n: usize) -> Vec<Credential> {
    (0..n)
        .map(|i| Credential::new(format!("ck{i}"), "cs", format!("at{i}"), "ats"))
        .collect()
}

/// Unix time the test clocks start at.
pub(crate) const START_UNIX: u64 = 1_700_000_000;

pub(crate) fn clock() -> twitter_pool::Clock {
    twitter_pool::Clock::starting_at(std::time::Duration::from_secs(START_UNIX))
}
