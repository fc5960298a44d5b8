//! HTTP transport abstraction for the Twitter API client
//!
//! Defines the `Session` trait that decouples request scheduling from the
//! concrete HTTP stack. `HttpSession` wraps a reqwest client; tests substitute
//! scripted sessions that replay statuses, bodies, and faults.
//!
//! The transport surfaces distinguishable fault categories (connection reset,
//! read timeout, content decoding, connection error) so the recovery layer can
//! decide what to retry. Status codes are never turned into errors here: every
//! response, including 429 and 5xx, is handed back to the caller.

pub mod error;
pub mod http;
pub mod request;
pub mod response;

pub use error::{Fault, Result, TransportError};
pub use http::{HttpSession, HttpSettings};
pub use request::ApiRequest;
pub use response::{ApiResponse, BodyStream, LineReader, MAX_LINE_BYTES};

pub use reqwest::Method;
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use std::future::Future;
use std::pin::Pin;

/// Produces the `Authorization` header value for an outgoing request.
///
/// `params` holds every query and form parameter of the request, which
/// signature schemes such as OAuth 1.0a fold into the signed base string.
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, method: &str, url: &str, params: &[(String, String)]) -> Result<String>;
}

/// One live, authenticated connection to the remote service.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Box<dyn Session>`).
pub trait Session: Send {
    /// Send a request and return the response head with an unread body.
    fn execute<'a>(
        &'a mut self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>>;

    /// Release the underlying connections. Further `execute` calls fail.
    fn close(&mut self);
}
