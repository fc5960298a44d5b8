//! Twitter API authentication library
//!
//! Holds the credential tuple the client rotates through and the OAuth 1.0a
//! signer that turns one credential into `Authorization` headers. Nothing here
//! performs network I/O; the signer plugs into the transport through
//! `transport::RequestSigner`.
//!
//! Credential flow:
//! 1. The service builds `Credential`s from its configuration
//! 2. The client's session manager checks `Credential::is_complete()`
//! 3. `OAuth1Signer::new()` wraps the credential for one HTTP session
//! 4. Each request is signed over its query and form parameters

pub mod constants;
pub mod credentials;
pub mod error;
pub mod oauth1;

pub use constants::*;
pub use credentials::Credential;
pub use error::{Error, Result};
pub use oauth1::OAuth1Signer;
