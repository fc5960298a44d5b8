//! Common types shared by the Twitter harvesting crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
