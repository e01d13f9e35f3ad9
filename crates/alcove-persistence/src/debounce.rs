//! Write-coalescing debounce state machine.
//!
//! Pure bookkeeping over caller-supplied instants: nothing here sleeps or
//! spawns. An async driver (see [`crate::runtime`]) or a synchronous caller
//! polls [`Debouncer::is_due`] with its own clock, which keeps every path
//! through the scheduler testable without waiting on real time.

use std::time::{Duration, Instant};

/// Coalesces a burst of save requests into one flush.
///
/// Each request pushes the flush deadline out to `last request + window`, so
/// a quiet period of one window triggers the flush. A steady stream of
/// requests cannot starve the flush forever: the deadline is capped at
/// `first request + max_delay`, after which the flush fires even if requests
/// keep arriving.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    max_delay: Duration,
    first_request: Option<Instant>,
    last_request: Option<Instant>,
}

/// Deferral cap relative to the window when none is given explicitly.
const DEFAULT_MAX_DELAY_FACTOR: u32 = 10;

impl Debouncer {
    /// Creates a debouncer with the given quiet window and a deferral cap of
    /// ten windows.
    pub fn new(window: Duration) -> Self {
        Self::with_max_delay(window, window * DEFAULT_MAX_DELAY_FACTOR)
    }

    /// Creates a debouncer with an explicit deferral cap.
    pub fn with_max_delay(window: Duration, max_delay: Duration) -> Self {
        Self {
            window,
            max_delay: max_delay.max(window),
            first_request: None,
            last_request: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records a request at `now`, arming or extending the deadline.
    pub fn request(&mut self, now: Instant) {
        if self.first_request.is_none() {
            self.first_request = Some(now);
        }
        self.last_request = Some(now);
    }

    /// True when a request has been recorded and not yet cleared.
    pub fn is_pending(&self) -> bool {
        self.last_request.is_some()
    }

    /// The instant at which the pending work becomes due, if any is pending.
    pub fn deadline(&self) -> Option<Instant> {
        let first = self.first_request?;
        let last = self.last_request?;
        let by_window = last + self.window;
        let by_cap = first + self.max_delay;
        Some(by_window.min(by_cap))
    }

    /// True when pending work has reached its deadline at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Clears pending state; the next request starts a fresh cycle.
    pub fn reset(&mut self) {
        self.first_request = None;
        self.last_request = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn test_idle_debouncer_is_never_due() {
        let debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.is_pending());
        assert!(debouncer.deadline().is_none());
        assert!(!debouncer.is_due(Instant::now()));
    }

    #[test]
    fn test_single_request_is_due_after_one_window() {
        let mut debouncer = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        debouncer.request(t0);

        assert!(debouncer.is_pending());
        assert!(!debouncer.is_due(t0));
        assert!(!debouncer.is_due(t0 + WINDOW / 2));
        assert!(debouncer.is_due(t0 + WINDOW));
    }

    #[test]
    fn test_later_request_extends_the_deadline() {
        let mut debouncer = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        debouncer.request(t0);
        debouncer.request(t0 + WINDOW / 2);

        assert!(!debouncer.is_due(t0 + WINDOW));
        assert!(debouncer.is_due(t0 + WINDOW / 2 + WINDOW));
    }

    #[test]
    fn test_continuous_requests_hit_the_deferral_cap() {
        let mut debouncer = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        // Keep requesting every quarter window, well past the cap
        let mut now = t0;
        for _ in 0..50 {
            debouncer.request(now);
            now += WINDOW / 4;
        }

        let cap = t0 + WINDOW * 10;
        assert_eq!(debouncer.deadline(), Some(cap));
        assert!(debouncer.is_due(cap));
    }

    #[test]
    fn test_reset_clears_pending_state() {
        let mut debouncer = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        debouncer.request(t0);
        debouncer.reset();

        assert!(!debouncer.is_pending());
        assert!(!debouncer.is_due(t0 + WINDOW * 100));

        // A fresh request after reset starts a new cap epoch
        let t1 = t0 + WINDOW * 20;
        debouncer.request(t1);
        assert_eq!(debouncer.deadline(), Some(t1 + WINDOW));
    }

    #[test]
    fn test_max_delay_never_shorter_than_window() {
        let mut debouncer = Debouncer::with_max_delay(WINDOW, Duration::from_millis(1));
        let t0 = Instant::now();
        debouncer.request(t0);
        assert_eq!(debouncer.deadline(), Some(t0 + WINDOW));
    }
}
