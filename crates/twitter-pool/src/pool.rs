//! Credential availability tracking and lowest-index selection
//!
//! The pool pairs each credential with the instant from which it may be used.
//! A credential is available once the current instant is strictly past that
//! mark; a credential that was never throttled is always available. The
//! availability list is built from the credential list itself, so the two are
//! the same length by construction.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};
use twitter_auth::Credential;

use crate::error::{Error, Result};

/// Outcome of a selection scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index of the credential to use.
    Ready(usize),
    /// Every credential is throttled; sleep this long, then scan again.
    Wait(Duration),
}

/// Fixed ordered set of credentials with per-credential reset instants.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    available_at: Vec<Option<Instant>>,
}

impl CredentialPool {
    /// Create a pool. Every credential starts available.
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::Empty);
        }
        let available_at = vec![None; credentials.len()];
        info!(credentials = credentials.len(), "credential pool initialized");
        Ok(Self {
            credentials,
            available_at,
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn credential(&self, index: usize) -> Result<&Credential> {
        self.credentials.get(index).ok_or(Error::UnknownCredential {
            index,
            size: self.credentials.len(),
        })
    }

    /// Reset instant recorded for a credential, if it was ever throttled.
    pub fn available_at(&self, index: usize) -> Option<Instant> {
        self.available_at.get(index).copied().flatten()
    }

    pub fn is_available(&self, index: usize, now: Instant) -> bool {
        match self.available_at(index) {
            Some(at) => now > at,
            None => index < self.len(),
        }
    }

    /// Pick the lowest-index available credential.
    ///
    /// When none is available, returns the time until the earliest reset plus
    /// `slack`.
    pub fn select(&self, now: Instant, slack: Duration) -> Selection {
        if let Some(index) = (0..self.len()).find(|&i| self.is_available(i, now)) {
            debug!(credential = index, "selected credential");
            return Selection::Ready(index);
        }

        let earliest = self.available_at.iter().flatten().min().copied();
        let wait = match earliest {
            Some(at) => at.saturating_duration_since(now) + slack,
            None => slack,
        };
        Selection::Wait(wait)
    }

    /// Record that a credential is throttled until `until`.
    ///
    /// Other credentials are untouched.
    pub fn mark_rate_limited(&mut self, index: usize, until: Instant) -> Result<()> {
        let size = self.available_at.len();
        let slot = self
            .available_at
            .get_mut(index)
            .ok_or(Error::UnknownCredential { index, size })?;
        *slot = Some(until);
        info!(credential = index, "credential rate limited");
        Ok(())
    }

    /// Pool health summary for logs.
    ///
    /// Status mapping: all available → healthy, some available → degraded,
    /// none available → exhausted.
    pub fn health(&self, now: Instant) -> serde_json::Value {
        let mut credentials = Vec::with_capacity(self.len());
        let mut available = 0usize;

        for index in 0..self.len() {
            if self.is_available(index, now) {
                available += 1;
                credentials.push(serde_json::json!({
                    "credential": index,
                    "status": "available"
                }));
            } else {
                let reset_in = self
                    .available_at(index)
                    .map(|at| at.saturating_duration_since(now).as_secs())
                    .unwrap_or(0);
                credentials.push(serde_json::json!({
                    "credential": index,
                    "status": "rate_limited",
                    "reset_in_secs": reset_in
                }));
            }
        }

        let total = self.len();
        let status = if available == total {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else {
            "exhausted"
        };

        serde_json::json!({
            "status": status,
            "credentials_total": total,
            "credentials_available": available,
            "credentials_rate_limited": total - available,
            "credentials": credentials
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(n: usize) -> Vec<Credential> {
        (0..n)
            .map(|i| Credential::new(format!("ck{i}"), "cs", format!("at{i}"), "ats"))
            .collect()
    }

    fn pool(n: usize) -> CredentialPool {
        CredentialPool::new(credentials(n)).unwrap()
    }

    const SLACK: Duration = Duration::from_secs(10);

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(CredentialPool::new(vec![]), Err(Error::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn all_available_selects_lowest_index() {
        for n in 1..=5 {
            let pool = pool(n);
            assert_eq!(pool.select(Instant::now(), SLACK), Selection::Ready(0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn past_resets_still_select_lowest_index() {
        let mut pool = pool(3);
        let start = Instant::now();
        pool.mark_rate_limited(0, start + Duration::from_secs(50)).unwrap();
        pool.mark_rate_limited(1, start + Duration::from_secs(5)).unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(pool.select(Instant::now(), SLACK), Selection::Ready(0));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_credential_is_skipped() {
        let mut pool = pool(3);
        let now = Instant::now();
        pool.mark_rate_limited(0, now + Duration::from_secs(300)).unwrap();
        assert_eq!(pool.select(now, SLACK), Selection::Ready(1));
        assert!(pool.is_available(2, now));
    }

    #[tokio::test(start_paused = true)]
    async fn availability_requires_strictly_later_instant() {
        let mut pool = pool(1);
        let now = Instant::now();
        pool.mark_rate_limited(0, now).unwrap();
        assert!(!pool.is_available(0, now));
        assert!(pool.is_available(0, now + Duration::from_millis(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn all_throttled_waits_for_earliest_reset_plus_slack() {
        let mut pool = pool(3);
        let now = Instant::now();
        pool.mark_rate_limited(0, now + Duration::from_secs(600)).unwrap();
        pool.mark_rate_limited(1, now + Duration::from_secs(120)).unwrap();
        pool.mark_rate_limited(2, now + Duration::from_secs(900)).unwrap();
        assert_eq!(
            pool.select(now, SLACK),
            Selection::Wait(Duration::from_secs(130))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mark_rate_limited_touches_only_one_credential() {
        let mut pool = pool(3);
        let until = Instant::now() + Duration::from_secs(900);
        pool.mark_rate_limited(1, until).unwrap();
        assert_eq!(pool.available_at(0), None);
        assert_eq!(pool.available_at(1), Some(until));
        assert_eq!(pool.available_at(2), None);
    }

    #[test]
    fn mark_unknown_credential_errors() {
        let mut pool = pool(2);
        let err = pool.mark_rate_limited(2, Instant::now()).unwrap_err();
        assert!(matches!(err, Error::UnknownCredential { index: 2, size: 2 }));
        assert!(pool.credential(2).is_err());
        assert_eq!(pool.credential(1).unwrap().consumer_key, "ck1");
    }

    #[tokio::test(start_paused = true)]
    async fn health_reports_status_and_reset() {
        let mut pool = pool(2);
        let now = Instant::now();
        assert_eq!(pool.health(now)["status"], "healthy");

        pool.mark_rate_limited(0, now + Duration::from_secs(120)).unwrap();
        let health = pool.health(now);
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["credentials_available"], 1);
        assert_eq!(health["credentials"][0]["status"], "rate_limited");
        assert_eq!(health["credentials"][0]["reset_in_secs"], 120);

        pool.mark_rate_limited(1, now + Duration::from_secs(60)).unwrap();
        let health = pool.health(now);
        assert_eq!(health["status"], "exhausted");
        assert_eq!(health["credentials_rate_limited"], 2);
    }
}
