use crate::outcome::Outcome;

/// Initial value of `min_time` before any reply arrives.
pub const NO_MIN_TIME: u32 = u32::MAX;

/// Running counters over every probe of a session. Never decremented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    num_sent: u64,
    num_received: u64,
    min_time: u32,
    max_time: u32,
    avg_accumulator: u64,
}

/// Point-in-time copy of [`Statistics`] with the derived values filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsSummary {
    pub num_sent: u64,
    pub num_received: u64,
    pub pct_lost: f64,
    pub min_time: u32,
    pub max_time: u32,
    pub avg_time: u64,
}

impl StatisticsSummary {
    pub fn has_replies(&self) -> bool {
        self.num_received > 0
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            num_sent: 0,
            num_received: 0,
            min_time: NO_MIN_TIME,
            max_time: 0,
            avg_accumulator: 0,
        }
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, outcome: &Outcome) {
        self.num_sent += 1;
        if outcome.success {
            let rtt = outcome.round_trip_millis;
            self.num_received += 1;
            self.min_time = self.min_time.min(rtt);
            self.max_time = self.max_time.max(rtt);
            self.avg_accumulator += u64::from(rtt);
        }
    }

    pub fn snapshot(&self) -> StatisticsSummary {
        let pct_lost = if self.num_sent == 0 {
            0.0
        } else {
            100.0 * (self.num_sent - self.num_received) as f64 / self.num_sent as f64
        };
        let avg_time = if self.num_received == 0 {
            0
        } else {
            self.avg_accumulator / self.num_received
        };

        StatisticsSummary {
            num_sent: self.num_sent,
            num_received: self.num_received,
            pct_lost,
            min_time: self.min_time,
            max_time: self.max_time,
            avg_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    fn failed() -> Outcome {
        Outcome::failure(Duration::from_millis(3000))
    }

    #[test]
    fn empty_snapshot_does_not_divide_by_zero() {
        let summary = Statistics::new().snapshot();
        assert_eq!(summary.num_sent, 0);
        assert_eq!(summary.pct_lost, 0.0);
        assert_eq!(summary.avg_time, 0);
        assert!(!summary.has_replies());
    }

    #[test]
    fn failures_leave_latency_sentinels() {
        let mut stats = Statistics::new();
        for _ in 0..3 {
            stats.update(&failed());
        }
        let summary = stats.snapshot();
        assert_eq!(summary.num_sent, 3);
        assert_eq!(summary.num_received, 0);
        assert_eq!(summary.pct_lost, 100.0);
        assert_eq!(summary.avg_time, 0);
        assert_eq!(summary.min_time, NO_MIN_TIME);
        assert_eq!(summary.max_time, 0);
    }

    #[test]
    fn mixed_run_of_ten() {
        let mut stats = Statistics::new();
        for rtt in [10, 20, 30, 40, 50, 60, 70] {
            stats.update(&Outcome::success(rtt, 117));
        }
        for _ in 0..3 {
            stats.update(&failed());
        }
        let summary = stats.snapshot();
        assert_eq!(summary.num_sent, 10);
        assert_eq!(summary.num_received, 7);
        assert_eq!(summary.min_time, 10);
        assert_eq!(summary.max_time, 70);
        assert_eq!(summary.avg_time, 40);
        assert!((summary.pct_lost - 30.0).abs() < 1e-9);
    }

    #[test]
    fn average_truncates() {
        let mut stats = Statistics::new();
        stats.update(&Outcome::success(1, 64));
        stats.update(&Outcome::success(2, 64));
        assert_eq!(stats.snapshot().avg_time, 1);
    }

    proptest! {
        #[test]
        fn counters_are_monotonic(script in prop::collection::vec((any::<bool>(), 0u32..10_000), 0..200)) {
            let mut stats = Statistics::new();
            let mut prev = stats.snapshot();
            for (success, rtt) in script {
                let outcome = if success { Outcome::success(rtt, 64) } else { failed() };
                stats.update(&outcome);
                let next = stats.snapshot();
                prop_assert!(next.num_received <= next.num_sent);
                prop_assert_eq!(next.num_sent, prev.num_sent + 1);
                prop_assert!(next.num_received >= prev.num_received);
                prop_assert!((0.0..=100.0).contains(&next.pct_lost));
                prev = next;
            }
        }
    }
}
