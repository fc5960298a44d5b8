//! Error types for client operations
//!
//! Only failures the client could not absorb reach the caller: an exhausted
//! retry ceiling, an unretried status, a broken payload, or a credential that
//! cannot be used at all.

use transport::{Fault, TransportError};

/// Errors surfaced to callers of the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pool(#[from] twitter_pool::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status, for errors raised from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport fault class, for errors raised by the connection.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            Error::Transport(err) => Some(err.fault()),
            _ => None,
        }
    }

    /// Errors that no retry or reconnect can fix.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(self, Error::MissingCredentials(_) | Error::Pool(_))
    }
}
