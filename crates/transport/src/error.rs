//! Transport fault taxonomy
//!
//! reqwest reports failures through a single error type; the recovery layer
//! needs to tell a peer reset from a read timeout from a broken gzip stream.
//! `From<reqwest::Error>` walks the error's source chain to recover that.

use std::error::Error as StdError;

/// Errors raised while talking to the remote service.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    #[error("read timed out: {0}")]
    Timeout(String),

    #[error("content decoding failed: {0}")]
    Decode(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response body interrupted: {0}")]
    Body(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Coarse fault class used to drive reconnect-and-retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ConnectionReset,
    Timeout,
    Decode,
    Connect,
    Other,
}

impl Fault {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Fault::ConnectionReset => "connection_reset",
            Fault::Timeout => "timeout",
            Fault::Decode => "decode",
            Fault::Connect => "connect",
            Fault::Other => "other",
        }
    }
}

impl TransportError {
    /// Fault class of this error.
    pub fn fault(&self) -> Fault {
        match self {
            TransportError::ConnectionReset(_) => Fault::ConnectionReset,
            TransportError::Timeout(_) => Fault::Timeout,
            TransportError::Decode(_) => Fault::Decode,
            TransportError::Connect(_) => Fault::Connect,
            TransportError::Body(_)
            | TransportError::Json(_)
            | TransportError::Signing(_)
            | TransportError::Other(_) => Fault::Other,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);
        // A reset can surface wrapped in a connect or body error; check it first.
        if is_connection_reset(&err) {
            TransportError::ConnectionReset(message)
        } else if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_decode() {
            TransportError::Decode(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() {
            TransportError::Body(message)
        } else {
            TransportError::Other(message)
        }
    }
}

/// Whether any error in the source chain is a peer reset.
///
/// TLS stacks do not always preserve the io error kind, so the rendered
/// message is checked as a fallback.
pub(crate) fn is_connection_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        let text = e.to_string().to_lowercase();
        if text.contains("connection reset") || text.contains("reset by peer") {
            return true;
        }
        current = e.source();
    }
    false
}

/// Render an error and its sources as `outer: inner: root`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("request error")]
    struct Wrapper(#[source] std::io::Error);

    #[test]
    fn reset_detected_through_source_chain() {
        let inner = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        let wrapped = Wrapper(inner);
        assert!(is_connection_reset(&wrapped));
    }

    #[test]
    fn reset_detected_from_message() {
        let io = std::io::Error::other("tls: Connection reset by peer (os error 104)");
        assert!(is_connection_reset(&io));
    }

    #[test]
    fn other_io_errors_are_not_resets() {
        let io = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert!(!is_connection_reset(&Wrapper(io)));
    }

    #[test]
    fn error_chain_joins_sources() {
        let wrapped = Wrapper(std::io::Error::other("socket closed"));
        assert_eq!(error_chain(&wrapped), "request error: socket closed");
    }

    #[test]
    fn fault_classes() {
        assert_eq!(
            TransportError::ConnectionReset("x".into()).fault(),
            Fault::ConnectionReset
        );
        assert_eq!(TransportError::Timeout("x".into()).fault(), Fault::Timeout);
        assert_eq!(TransportError::Decode("x".into()).fault(), Fault::Decode);
        assert_eq!(TransportError::Connect("x".into()).fault(), Fault::Connect);
        assert_eq!(TransportError::Body("x".into()).fault(), Fault::Other);
        assert_eq!(Fault::ConnectionReset.label(), "connection_reset");
    }

    #[tokio::test]
    async fn refused_connection_is_connect_fault() {
        let client = reqwest::Client::new();
        let err = client
            .get("http://127.0.0.1:1/unreachable")
            .send()
            .await
            .unwrap_err();
        let err = TransportError::from(err);
        assert_eq!(err.fault(), Fault::Connect, "got {err}");
    }
}
