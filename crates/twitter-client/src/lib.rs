//! Rate-limited, multi-credential Twitter API client
//!
//! Requests pass through three layers before reaching the wire:
//!
//! - `Recovery` reconnects and retries after transient network faults;
//! - `Scheduler` picks an unthrottled credential, waits out rate limits and
//!   backs off on server errors;
//! - `SessionManager` owns the one live session and rebuilds it when the
//!   active credential changes.
//!
//! Endpoint methods, pagination and the streaming controller sit on top of
//! [`Client::get`] and [`Client::post`]. Everything runs on the caller's
//! task, one request at a time.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod metrics;
pub mod options;
mod paginate;
pub mod recovery;
pub mod scheduler;
pub mod session;
pub mod stream;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::ClientConfig;
pub use endpoints::{ResultType, SearchOptions, UserLookup, UserRef, dehydrate};
pub use error::{Error, Result};
pub use options::{NotFound, RateLimits, RequestOptions, ServerErrors};
pub use paginate::LOOKUP_BATCH;
pub use recovery::Recovery;
pub use scheduler::{Scheduler, SchedulerPolicy};
pub use session::{Connect, HttpConnector, SessionManager};
pub use stream::FilterParams;
pub use tokio_util::sync::CancellationToken;
