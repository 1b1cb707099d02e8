//! Issue-time request pacing.
//!
//! Exactly one request is in flight at a time, so pacing reduces to a single
//! piece of mutable state: the instant of the previous dispatch. Pacing is by
//! issue time, not completion time, so the steady-state rate stays bounded
//! even when responses are slow.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

/// Enforces a minimum interval between request dispatches.
///
/// Uses `tokio::time::Instant` so tests can drive it under
/// `tokio::time::pause`.
#[derive(Debug)]
pub struct RequestPacer {
    min_delay: Duration,
    last_dispatch: Option<Instant>,
}

impl RequestPacer {
    /// Creates a pacer with the given minimum inter-request interval.
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_dispatch: None,
        }
    }

    /// Returns the configured minimum interval.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits until at least `min_delay` has passed since the previous
    /// dispatch, then records now as the new dispatch time.
    ///
    /// The first call proceeds immediately. The dispatch time is recorded
    /// only after the wait completes, so a caller that cancels this future
    /// mid-wait has not consumed a dispatch slot.
    pub async fn wait_turn(&mut self) {
        if let Some(last) = self.last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let delay = self.min_delay - elapsed;
                debug!(delay_ms = delay.as_millis(), "pacing before dispatch");
                sleep(delay).await;
            }
        }
        self.last_dispatch = Some(Instant::now());
    }
}
