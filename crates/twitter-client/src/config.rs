//! Client tuning knobs
//!
//! Every field has a default, so an empty `[client]` table (or none at all)
//! yields a working configuration.

use std::time::Duration;

use serde::Deserialize;
use transport::HttpSettings;
use twitter_auth::{API_BASE, STREAM_BASE};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base: String,
    pub stream_base: String,
    /// Sent as `tweet_mode` on every REST request.
    pub tweet_mode: String,
    /// Read timeout; a stalled connection surfaces as a timeout fault.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Connection errors tolerated per call before giving up. 0 = unlimited.
    pub connection_errors: u32,
    /// Consecutive stream errors tolerated before a stream gives up. 0 = unlimited.
    pub http_errors: u32,
    /// 5xx responses retried per call before the status is raised.
    pub server_error_ceiling: u32,
    /// Server-error backoff step; the n-th retry waits n times this.
    pub server_error_backoff_secs: u64,
    /// Added to the earliest reset when every credential is throttled.
    pub rate_limit_slack_secs: u64,
    pub not_found_retry_delay_ms: u64,
    /// Throttle window assumed when a 429 carries no usable reset header.
    pub rate_limit_fallback_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            stream_base: STREAM_BASE.to_string(),
            tweet_mode: "extended".to_string(),
            timeout_secs: 90,
            connect_timeout_secs: 30,
            connection_errors: 0,
            http_errors: 0,
            server_error_ceiling: 30,
            server_error_backoff_secs: 60,
            rate_limit_slack_secs: 10,
            not_found_retry_delay_ms: 1000,
            rate_limit_fallback_secs: 900,
        }
    }
}

impl ClientConfig {
    /// Check values that would make the client unusable.
    pub fn validate(&self) -> common::Result<()> {
        for (name, url) in [("api_base", &self.api_base), ("stream_base", &self.stream_base)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server_error_ceiling == 0 {
            return Err(common::Error::Config(
                "server_error_ceiling must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Full REST URL for a path such as `search/tweets.json`.
    pub fn api_url(&self, path: &str) -> String {
        join(&self.api_base, path)
    }

    pub fn stream_url(&self, path: &str) -> String {
        join(&self.stream_base, path)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            read_timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..HttpSettings::default()
        }
    }

    pub fn rate_limit_slack(&self) -> Duration {
        Duration::from_secs(self.rate_limit_slack_secs)
    }

    pub fn rate_limit_fallback(&self) -> Duration {
        Duration::from_secs(self.rate_limit_fallback_secs)
    }

    pub fn server_error_backoff(&self) -> Duration {
        Duration::from_secs(self.server_error_backoff_secs)
    }

    pub fn not_found_retry_delay(&self) -> Duration {
        Duration::from_millis(self.not_found_retry_delay_ms)
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
