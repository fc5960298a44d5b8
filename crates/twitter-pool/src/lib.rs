//! Credential pool for the Twitter API client
//!
//! Tracks, for a fixed ordered list of credentials, the instant from which
//! each one may be used again. Selection always prefers the lowest-index
//! available credential, so a run keeps using its first credential until the
//! service throttles it.
//!
//! Credential lifecycle:
//! 1. Client construction hands the configured credentials to `CredentialPool::new`
//! 2. `select()` returns the first credential whose reset has passed
//! 3. A 429 response → `mark_rate_limited()` with the reset from `rate_limit::reset_at`
//! 4. When every credential is throttled, `select()` returns how long to wait
//! 5. Reset passes → the credential is selectable again without explicit action

pub mod clock;
pub mod error;
pub mod pool;
pub mod rate_limit;

pub use clock::Clock;
pub use error::{Error, Result};
pub use pool::{CredentialPool, Selection};
pub use rate_limit::{RATE_LIMIT_RESET_HEADER, StatusClass, classify_status, reset_at, stream_backoff};
