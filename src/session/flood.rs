//! Outgoing flood guard.
//!
//! Sliding-window budget for outgoing messages: at most `limit` sends
//! per `window`. Messages over budget are dropped by the caller, never
//! delayed, so nothing here can block the event loop. A limit of zero
//! disables the guard.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct FloodGuard {
    sent: Vec<Instant>,
    limit: usize,
    window: Duration,
}

impl FloodGuard {
    pub fn new(limit: usize, window: Duration) -> Self {
        FloodGuard {
            sent: Vec::new(),
            limit,
            window,
        }
    }

    /// Disabled guard that always allows.
    pub fn off() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// Whether a message may be sent now; records it when allowed.
    pub fn allow(&mut self) -> bool {
        if self.limit == 0 {
            return true;
        }
        let now = Instant::now();
        self.sent.retain(|&at| now.duration_since(at) < self.window);

        if self.sent.len() >= self.limit {
            false
        } else {
            self.sent.push(now);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flood_guard_allows_under_limit() {
        let mut guard = FloodGuard::new(3, Duration::from_secs(1));
        assert!(guard.allow());
        assert!(guard.allow());
        assert!(guard.allow());
    }

    #[test]
    fn test_flood_guard_blocks_over_limit() {
        let mut guard = FloodGuard::new(2, Duration::from_secs(60));
        assert!(guard.allow());
        assert!(guard.allow());
        assert!(!guard.allow());
    }

    #[test]
    fn test_flood_guard_resets_after_window() {
        let mut guard = FloodGuard::new(1, Duration::from_millis(20));
        assert!(guard.allow());
        assert!(!guard.allow());

        std::thread::sleep(Duration::from_millis(30));
        assert!(guard.allow());
    }

    #[test]
    fn test_zero_limit_disables_guard() {
        let mut guard = FloodGuard::off();
        assert!(!guard.is_enabled());
        for _ in 0..100 {
            assert!(guard.allow());
        }
    }
}
