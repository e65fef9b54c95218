//! Minimum-interval throttle for sequential external calls.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum elapsed time between the starts of successive
/// calls, with an optional one-off cool-down after a rate-limit response.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_delay: Duration,
    cooldown: Duration,
    next_allowed: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle. The first call is never delayed.
    #[must_use]
    pub const fn new(min_delay: Duration, cooldown: Duration) -> Self {
        Self {
            min_delay,
            cooldown,
            next_allowed: None,
        }
    }

    /// Waits until the next call is allowed, then reserves the slot.
    pub async fn wait(&mut self) {
        if let Some(at) = self.next_allowed {
            tokio::time::sleep_until(at).await;
        }
        self.next_allowed = Some(Instant::now() + self.min_delay);
    }

    /// Pushes the next allowed call back by the cool-down.
    pub fn back_off(&mut self) {
        let wait = self.cooldown.max(self.min_delay);
        log::warn!("Rate limited, pausing lookups for {}s", wait.as_secs());
        self.next_allowed = Some(Instant::now() + wait);
    }
}
