//! Wall clock anchored to the tokio clock
//!
//! The service reports rate-limit resets as absolute Unix timestamps, while
//! every wait in the client is a tokio sleep. The clock samples the system
//! time once and from then on advances with `tokio::time::Instant`, so the
//! two never drift apart and paused-time tests see a consistent wall clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Unix time at `anchor`.
    unix_at_anchor: Duration,
    anchor: Instant,
}

impl Clock {
    /// Clock reading the current system time.
    pub fn system() -> Self {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::starting_at(unix)
    }

    /// Clock whose current Unix time is `unix`.
    pub fn starting_at(unix: Duration) -> Self {
        Self {
            unix_at_anchor: unix,
            anchor: Instant::now(),
        }
    }

    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Current Unix time.
    pub fn unix_now(&self) -> Duration {
        self.unix_at_anchor + self.anchor.elapsed()
    }

    /// Instant corresponding to a Unix timestamp in seconds.
    ///
    /// Timestamps before the anchor map to the anchor itself.
    pub fn instant_at(&self, unix_secs: u64) -> Instant {
        let target = Duration::from_secs(unix_secs);
        match target.checked_sub(self.unix_at_anchor) {
            Some(offset) => self.anchor + offset,
            None => self.anchor,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
