// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `context.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_throttle_delay_grows_per_cluster() {
        let tracker = ThrottleTracker::default();

        let first = tracker.next_delay("clusters/a");
        let second = tracker.next_delay("clusters/a");
        let third = tracker.next_delay("clusters/a");
        assert!(first <= Duration::from_millis(110));
        assert!(second >= Duration::from_millis(180));
        assert!(third >= Duration::from_millis(360));

        // Another cluster starts from the beginning
        assert!(tracker.next_delay("clusters/b") <= Duration::from_millis(110));
    }

    #[test]
    fn test_throttle_delay_is_capped() {
        let tracker = ThrottleTracker::default();
        let mut last = Duration::ZERO;
        for _ in 0..30 {
            last = tracker.next_delay("clusters/a");
        }
        assert!(last <= Duration::from_secs(33));
        assert!(last >= Duration::from_secs(27));
    }

    #[test]
    fn test_reset_forgets_cluster() {
        let tracker = ThrottleTracker::default();
        tracker.next_delay("clusters/a");
        tracker.next_delay("clusters/a");
        assert!(tracker.is_throttled("clusters/a"));

        tracker.reset("clusters/a");
        assert!(!tracker.is_throttled("clusters/a"));
        assert!(tracker.next_delay("clusters/a") <= Duration::from_millis(110));
    }
}
