//! Twitter API constants
//!
//! Base URLs for the v1.1 REST and streaming endpoint families, and the fixed
//! parts of an OAuth 1.0a signature.

/// REST endpoint base
pub const API_BASE: &str = "https://api.twitter.com/1.1";

/// Streaming endpoint base (filter/sample)
pub const STREAM_BASE: &str = "https://stream.twitter.com/1.1";

pub const OAUTH_SIGNATURE_METHOD: &str = "HMAC-SHA1";

pub const OAUTH_VERSION: &str = "1.0";
