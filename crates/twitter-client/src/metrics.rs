//! Client metrics
//!
//! Recorded through the `metrics` facade; the embedding service decides
//! whether a recorder is installed.
//!
//! - `twitter_requests_total` (counter): labels `method`, `status`
//! - `twitter_rate_limited_total` (counter): label `credential`
//! - `twitter_server_errors_total` (counter): label `status`
//! - `twitter_reconnects_total` (counter): label `reason`
//! - `twitter_stream_events_total` (counter)
//! - `twitter_stream_disconnects_total` (counter): label `kind`
//! - `twitter_active_credential` (gauge)

pub fn record_request(method: &str, status: u16) {
    metrics::counter!("twitter_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
}

pub fn record_rate_limited(credential: usize) {
    metrics::counter!("twitter_rate_limited_total", "credential" => credential.to_string())
        .increment(1);
}

pub fn record_server_error(status: u16) {
    metrics::counter!("twitter_server_errors_total", "status" => status.to_string()).increment(1);
}

pub fn record_reconnect(reason: &str) {
    metrics::counter!("twitter_reconnects_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_stream_event() {
    metrics::counter!("twitter_stream_events_total").increment(1);
}

pub fn record_stream_disconnect(kind: &str) {
    metrics::counter!("twitter_stream_disconnects_total", "kind" => kind.to_string()).increment(1);
}

pub fn set_active_credential(credential: usize) {
    metrics::gauge!("twitter_active_credential").set(credential as f64);
}
