//! Per-tool denial tracking and the rate-limit backoff schedule.

use std::time::{Duration, SystemTime};

/// Backoff duration in seconds, indexed by `min(denial_count - 1, 5)`
/// (spec §3). Saturates at 300 seconds.
pub const BACKOFF_SCHEDULE_SECS: [u64; 6] = [0, 0, 5, 15, 60, 300];

/// Look up the backoff duration for a given denial count (count >= 1).
#[must_use]
pub fn backoff_for_count(count: u32) -> Duration {
    let index = (count.saturating_sub(1) as usize).min(BACKOFF_SCHEDULE_SECS.len() - 1);
    Duration::from_secs(BACKOFF_SCHEDULE_SECS[index])
}

/// Per-tool denial record.
///
/// Invariant: `backoff_until >= last_denial` whenever both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenialTracker {
    pub count: u32,
    pub last_denial: Option<SystemTime>,
    pub backoff_until: Option<SystemTime>,
}

impl DenialTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if this tool is currently rate-limited relative to `now`.
    #[must_use]
    pub fn is_rate_limited(&self, now: SystemTime) -> bool {
        self.backoff_until.is_some_and(|until| until > now)
    }

    /// Record a denial at `now`, advancing the backoff window.
    pub fn record_denial(&mut self, now: SystemTime) {
        self.count += 1;
        self.last_denial = Some(now);
        self.backoff_until = Some(now + backoff_for_count(self.count));
    }

    /// Reset the tracker after an `Allowed`/`AllowedAlways` outcome
    /// (spec §4.1 step 8).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Seconds remaining until `backoff_until`, for the `retry_after` field
    /// of a `rate_limited` error payload. Zero if not currently limited.
    #[must_use]
    pub fn retry_after_secs(&self, now: SystemTime) -> u64 {
        match self.backoff_until {
            Some(until) if until > now => until.duration_since(now).unwrap_or_default().as_secs(),
            _ => 0,
        }
    }
}
