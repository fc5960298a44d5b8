//! Response head plus a lazily read body
//!
//! The body stays a byte stream until a consumer picks how to read it:
//! buffered (`bytes`, `text`, `json`) for REST calls, or line by line
//! (`lines`) for long-lived streaming connections. Dropping the response
//! releases the underlying connection.

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{Result, TransportError};

/// Longest line `lines` accepts before giving up on the body.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Boxed stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

pub struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    body: BodyStream,
}

impl ApiResponse {
    pub fn new<S>(status: u16, headers: HeaderMap, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: Box::pin(body),
        }
    }

    /// Response with a fully buffered body.
    pub fn from_body(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, headers, stream::once(async move { Ok(body) }))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Read the whole body.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }

    /// Read the whole body now, keeping status and headers.
    ///
    /// Faults raised while the body arrives (decoding, read timeout, reset)
    /// surface here instead of at the later read.
    pub async fn buffered(self) -> Result<ApiResponse> {
        let status = self.status;
        let headers = self.headers.clone();
        let body = self.bytes().await?;
        Ok(ApiResponse::from_body(status, headers, body))
    }

    /// Read the whole body as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read and deserialize the whole body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the body as newline-delimited records.
    pub fn lines(self) -> LineReader {
        self.lines_with_limit(MAX_LINE_BYTES)
    }

    /// Line reader that fails once a line grows past `max_line` bytes.
    pub fn lines_with_limit(self, max_line: usize) -> LineReader {
        LineReader {
            body: self.body,
            buffer: Vec::new(),
            scanned: 0,
            max_line,
            finished: false,
        }
    }
}

impl fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Splits a body stream into lines.
///
/// Lines end at `\n`; a trailing `\r` is stripped. Empty lines are returned
/// as empty buffers (streaming endpoints send them as keep-alives). A final
/// unterminated line is returned when the body ends. A line longer than the
/// reader's limit ends the body with `TransportError::Body`.
pub struct LineReader {
    body: BodyStream,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no `\n`.
    scanned: usize,
    max_line: usize,
    finished: bool,
}

impl LineReader {
    /// Next line, `None` once the body is exhausted or after an error.
    pub async fn next_line(&mut self) -> Option<Result<Vec<u8>>> {
        loop {
            if let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
                let pos = self.scanned + offset;
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                self.scanned = 0;
                line.pop();
                strip_cr(&mut line);
                return Some(Ok(line));
            }
            self.scanned = self.buffer.len();

            if self.buffer.len() > self.max_line {
                let len = self.buffer.len();
                self.fail();
                return Some(Err(TransportError::Body(format!(
                    "line of {len} bytes exceeds limit of {}",
                    self.max_line
                ))));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return None;
                }
                let mut line = std::mem::take(&mut self.buffer);
                self.scanned = 0;
                strip_cr(&mut line);
                return Some(Ok(line));
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.fail();
                    return Some(Err(e));
                }
                None => self.finished = true,
            }
        }
    }

    fn fail(&mut self) {
        self.finished = true;
        self.buffer.clear();
        self.scanned = 0;
    }
}

fn strip_cr(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}
