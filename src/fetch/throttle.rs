//! Rolling-window request throttle
//!
//! The policy is "at most N requests in any trailing window of W", not "N per
//! calendar minute", so the throttle keeps the instants of recent requests and
//! measures the window from each caller's `now`.

use crate::fetch::clock::Clock;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tracks recent request instants and enforces the rolling-window cap
///
/// The throttle belongs to whichever component issues the requests. It is
/// never shared through globals, so independent throttles can coexist.
#[derive(Debug, Clone)]
pub struct RequestThrottle {
    /// Maximum requests allowed inside one window
    max_requests: usize,

    /// Length of the trailing window
    window: Duration,

    /// Margin added to every computed wait
    guard: Duration,

    /// Request instants, oldest first
    timestamps: VecDeque<Instant>,
}

impl RequestThrottle {
    /// Creates a throttle allowing `max_requests` per `window`
    ///
    /// # Arguments
    ///
    /// * `max_requests` - Cap per window (treated as at least 1)
    /// * `window` - Trailing window length
    /// * `guard` - Extra delay added to every throttle sleep
    pub fn new(max_requests: usize, window: Duration, guard: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            guard,
            timestamps: VecDeque::new(),
        }
    }

    /// Drops every recorded instant that is at least one window old
    pub fn purge(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };

        while let Some(&oldest) = self.timestamps.front() {
            if oldest <= cutoff {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Purges, then returns how long the caller must wait before the next request
    ///
    /// Returns `None` when the window still has room.
    pub fn required_wait(&mut self, now: Instant) -> Option<Duration> {
        self.purge(now);

        if self.timestamps.len() < self.max_requests {
            return None;
        }

        let oldest = *self.timestamps.front()?;
        let free_at = oldest + self.window + self.guard;
        Some(free_at.saturating_duration_since(now))
    }

    /// Suspends the caller until the window has room for one more request
    ///
    /// Calling this twice without an intervening `record` sleeps at most once:
    /// after the first sleep the oldest instant has left the window.
    pub async fn wait_if_needed(&mut self, clock: &dyn Clock) {
        let Some(wait) = self.required_wait(clock.now()) else {
            return;
        };

        if !wait.is_zero() {
            tracing::info!(
                wait_secs = wait.as_secs_f64(),
                recent = self.timestamps.len(),
                max = self.max_requests,
                "Rate limit reached, sleeping to honor the request policy"
            );
            clock.sleep(wait).await;
        }

        self.purge(clock.now());
    }

    /// Records one issued request
    ///
    /// Must be called once per network request and never for cache hits.
    pub fn record(&mut self, now: Instant) {
        // Keep the deque sorted even if a caller hands in a stale instant.
        let at = match self.timestamps.back() {
            Some(&last) if now < last => last,
            _ => now,
        };
        self.timestamps.push_back(at);
    }

    /// Number of instants currently held
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns whether no request is held
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Count of held instants strictly inside `(now - window, now]`
    pub fn in_window(&self, now: Instant) -> usize {
        let cutoff = now.checked_sub(self.window);
        self.timestamps
            .iter()
            .filter(|&&t| t <= now && cutoff.map_or(true, |c| t > c))
            .count()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}
