//! Error types for pool operations

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no credentials configured")]
    Empty,

    #[error("credential index {index} out of range for pool of {size}")]
    UnknownCredential { index: usize, size: usize },
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
