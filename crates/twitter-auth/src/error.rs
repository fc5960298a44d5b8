//! Error types for credential and signing operations

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for transport::TransportError {
    fn from(err: Error) -> Self {
        transport::TransportError::Signing(err.to_string())
    }
}
