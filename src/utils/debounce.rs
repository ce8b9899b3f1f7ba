//! Quiet-period debouncing for text input.
//!
//! Every new value replaces the pending one and restarts the timer; a value
//! is released only after `quiet` has passed with no further input. Time is
//! always passed in, so callers and tests can drive it with any clock.

use std::time::{Duration, Instant};

/// Coalesces bursts of input into the last value.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Record new input at `now`, cancelling whatever was pending.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.quiet, value));
    }

    /// Release the pending value if its quiet period has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// When the pending value becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop pending input without releasing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(300);

    #[test]
    fn test_only_last_value_fires() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(QUIET);

        debouncer.push("p", start);
        debouncer.push("py", start + Duration::from_millis(100));
        debouncer.push("pyr", start + Duration::from_millis(250));

        // 300ms after the first key, but only 50ms after the last one.
        assert_eq!(debouncer.poll(start + Duration::from_millis(300)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(550)),
            Some("pyr")
        );
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(QUIET);

        debouncer.push(1, start);
        debouncer.cancel();
        assert_eq!(debouncer.poll(start + QUIET), None);
    }
}
