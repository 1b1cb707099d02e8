//! Backoff policy for throttled and failed fetches.
//!
//! The dispatcher distinguishes two retry tracks. Throttling retries without
//! bound by default, because rate limits are expected to clear; an optional
//! ceiling turns persistent throttling into an explicit abort instead of a
//! silent drop. Every other failure is transient and retries up to a bounded
//! attempt count before the query is recorded as failed and skipped.
//!
//! Both tracks sleep `min(cap, base * 2^n)` plus a small jitter, where `n`
//! counts failures so far on that track.

use std::time::Duration;

use rand::Rng;

/// Default total attempts for transient failures, including the first.
pub const DEFAULT_TRANSIENT_ATTEMPTS: u32 = 5;

/// Default cap on a single backoff sleep.
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Fallback base delay when the spec's pacing interval is zero.
const FALLBACK_BASE_DELAY: Duration = Duration::from_secs(1);

/// Maximum jitter added to each backoff sleep.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Backoff configuration for one run.
///
/// The base delay defaults to the spec's pacing interval, so backoff starts
/// from the rate the server already tolerates.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base_delay: Duration,
    cap: Duration,
    transient_attempts: u32,
    throttle_attempts: Option<u32>,
}

impl BackoffPolicy {
    /// Creates a policy with the given base delay and default ceilings.
    #[must_use]
    pub fn new(base_delay: Duration) -> Self {
        let base_delay = if base_delay.is_zero() {
            FALLBACK_BASE_DELAY
        } else {
            base_delay
        };
        Self {
            base_delay,
            cap: DEFAULT_BACKOFF_CAP,
            transient_attempts: DEFAULT_TRANSIENT_ATTEMPTS,
            throttle_attempts: None,
        }
    }

    /// Sets the total attempt budget for transient failures (minimum 1).
    #[must_use]
    pub fn with_transient_attempts(mut self, attempts: u32) -> Self {
        self.transient_attempts = attempts.max(1);
        self
    }

    /// Bounds throttle retries; when reached, the run aborts explicitly
    /// rather than dropping the query.
    #[must_use]
    pub fn with_throttle_ceiling(mut self, attempts: u32) -> Self {
        self.throttle_attempts = Some(attempts.max(1));
        self
    }

    /// Sets the cap on a single backoff sleep.
    #[must_use]
    pub fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Returns the base delay.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the total attempt budget for transient failures.
    #[must_use]
    pub fn transient_attempts(&self) -> u32 {
        self.transient_attempts
    }

    /// Returns the throttle retry ceiling, if one is configured.
    #[must_use]
    pub fn throttle_attempts(&self) -> Option<u32> {
        self.throttle_attempts
    }

    /// Returns the sleep before the retry after `failures` failures on a
    /// track: `min(cap, base * 2^failures)` plus jitter.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let factor = 1u64.checked_shl(failures).unwrap_or(u64::MAX);
        #[allow(clippy::cast_possible_truncation)]
        let base_ms = self.base_delay.as_millis() as u64;
        let delay = Duration::from_millis(base_ms.saturating_mul(factor)).min(self.cap);
        delay + jitter()
    }
}

/// Random jitter in `0..=MAX_JITTER`, spreading retries apart so repeated
/// failures do not land on the server in lockstep.
fn jitter() -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(0..=MAX_JITTER.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_secs(1))
    }

    #[test]
    fn test_delay_doubles_per_failure() {
        let policy = policy();
        // Each bound allows for jitter on top of the exponential term.
        let d0 = policy.delay_for(0);
        assert!(d0 >= Duration::from_secs(1) && d0 <= Duration::from_millis(1250));

        let d1 = policy.delay_for(1);
        assert!(d1 >= Duration::from_secs(2) && d1 <= Duration::from_millis(2250));

        let d2 = policy.delay_for(2);
        assert!(d2 >= Duration::from_secs(4) && d2 <= Duration::from_millis(4250));
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = policy().with_cap(Duration::from_secs(5));
        let delay = policy.delay_for(10);
        assert!(delay >= Duration::from_secs(5));
        assert!(delay <= Duration::from_millis(5250));
    }

    #[test]
    fn test_delay_survives_huge_failure_counts() {
        let delay = policy().delay_for(200);
        assert!(delay <= DEFAULT_BACKOFF_CAP + MAX_JITTER);
    }

    #[test]
    fn test_zero_base_falls_back() {
        let policy = BackoffPolicy::new(Duration::ZERO);
        assert_eq!(policy.base_delay(), FALLBACK_BASE_DELAY);
    }

    #[test]
    fn test_transient_attempts_minimum_is_one() {
        assert_eq!(policy().with_transient_attempts(0).transient_attempts(), 1);
    }

    #[test]
    fn test_throttle_ceiling_unbounded_by_default() {
        assert_eq!(policy().throttle_attempts(), None);
        assert_eq!(policy().with_throttle_ceiling(3).throttle_attempts(), Some(3));
    }

    #[test]
    fn test_jitter_within_bounds() {
        for _ in 0..100 {
            assert!(jitter() <= MAX_JITTER);
        }
    }
}
