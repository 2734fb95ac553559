// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Running statistics over a stream of duration measurements.

use std::time::Duration;

/// Running statistics for one tracked quantity, in microseconds.
///
/// A driver keeps one windowed instance (reset at every report) and one
/// overall instance (never reset) per quantity. The full sample list is
/// retained so the median can be computed on demand.
///
/// `min` uses zero as its "no sample yet" sentinel, so a genuine
/// zero-microsecond measurement never seeds it. That matches the
/// long-standing behavior of the reporting format this feeds; it is
/// pinned by tests rather than changed.
#[derive(Debug, Clone, Default)]
pub struct TimeStats {
    values: Vec<u64>,
    average: f64,
    min: u64,
    max: u64,
}

impl TimeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one measurement, updating the running aggregates.
    pub fn record(&mut self, micros: u64) {
        let count = self.values.len() as f64;
        self.average = (count * self.average + micros as f64) / (count + 1.0);
        self.values.push(micros);
        if self.min == 0 || micros < self.min {
            self.min = micros;
        }
        if micros > self.max {
            self.max = micros;
        }
    }

    /// Record a [`Duration`] measurement.
    pub fn record_duration(&mut self, elapsed: Duration) {
        self.record(elapsed.as_micros() as u64);
    }

    /// Number of measurements since the last reset.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Median of the recorded measurements; 0 when empty.
    ///
    /// Sorts a copy of the retained samples. For an even count the two
    /// middle values (indices `n/2 - 1` and `n/2`) are averaged.
    pub fn median(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let mut sorted = self.values.clone();
        sorted.sort_unstable();

        let n = sorted.len();
        if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        } else {
            sorted[n / 2] as f64
        }
    }

    /// Clear everything; returns `&mut self` so a window close can reset
    /// and keep recording in one expression.
    pub fn reset(&mut self) -> &mut Self {
        self.values.clear();
        self.average = 0.0;
        self.min = 0;
        self.max = 0;
        self
    }

    /// Copy of the current aggregates for display.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            count: self.values.len(),
            median: self.median(),
            average: self.average,
            min: self.min,
            max: self.max,
        }
    }
}

/// Display snapshot of a [`TimeStats`] instance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub count: usize,
    pub median: f64,
    pub average: f64,
    pub min: u64,
    pub max: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_and_extrema_track_inputs() {
        let mut stats = TimeStats::new();
        for v in [40, 10, 30, 20] {
            stats.record(v);
        }
        assert_eq!(stats.count(), 4);
        assert_eq!(stats.min(), 10);
        assert_eq!(stats.max(), 40);
        assert_eq!(stats.average(), 25.0);
    }

    #[test]
    fn test_incremental_average_matches_formula() {
        let mut stats = TimeStats::new();
        stats.record(10);
        assert_eq!(stats.average(), 10.0);
        stats.record(20);
        assert_eq!(stats.average(), 15.0);
        stats.record(60);
        assert_eq!(stats.average(), 30.0);
    }

    #[test]
    fn test_median_single_value() {
        let mut stats = TimeStats::new();
        stats.record(5);
        assert_eq!(stats.median(), 5.0);
    }

    #[test]
    fn test_median_two_values() {
        let mut stats = TimeStats::new();
        stats.record(1);
        stats.record(3);
        assert_eq!(stats.median(), 2.0);
    }

    #[test]
    fn test_median_even_count_uses_middle_pair() {
        let mut stats = TimeStats::new();
        for v in [4, 1, 3, 2] {
            stats.record(v);
        }
        // Sorted: [1,2,3,4]; indices 1 and 2 are averaged.
        assert_eq!(stats.median(), 2.5);
    }

    #[test]
    fn test_median_empty_is_zero() {
        assert_eq!(TimeStats::new().median(), 0.0);
    }

    #[test]
    fn test_median_unordered_input() {
        let mut stats = TimeStats::new();
        for v in [9, 1, 8, 2, 7] {
            stats.record(v);
        }
        assert_eq!(stats.median(), 7.0);
    }

    #[test]
    fn test_reset_then_single_record() {
        let mut stats = TimeStats::new();
        stats.record(100);
        stats.record(200);

        stats.reset().record(42);

        assert_eq!(stats.count(), 1);
        assert_eq!(stats.min(), 42);
        assert_eq!(stats.max(), 42);
        assert_eq!(stats.average(), 42.0);
        assert_eq!(stats.median(), 42.0);
    }

    #[test]
    fn test_min_sentinel_ignores_zero_measurement() {
        // Zero is the "unset" sentinel: a genuine 0us measurement does
        // not seed min, and min reports the next non-zero value.
        let mut stats = TimeStats::new();
        stats.record(0);
        assert_eq!(stats.min(), 0);
        stats.record(5);
        assert_eq!(stats.min(), 5);
        stats.record(3);
        assert_eq!(stats.min(), 3);
    }

    #[test]
    fn test_extrema_match_true_extrema_for_random_streams() {
        for _ in 0..50 {
            let mut stats = TimeStats::new();
            let n = 1 + fastrand::usize(..40);
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                // Non-zero so the min sentinel is not in play here.
                let v = 1 + fastrand::u64(..10_000);
                stats.record(v);
                values.push(v);
            }
            assert_eq!(stats.count(), n);
            assert_eq!(stats.min(), *values.iter().min().unwrap());
            assert_eq!(stats.max(), *values.iter().max().unwrap());
        }
    }

    #[test]
    fn test_min_within_median_and_max_ordering() {
        let mut stats = TimeStats::new();
        for v in [12, 7, 25, 19, 3] {
            stats.record(v);
        }
        assert!(stats.min() as f64 <= stats.median());
        assert!(stats.median() <= stats.max() as f64);
    }

    #[test]
    fn test_snapshot_copies_aggregates() {
        let mut stats = TimeStats::new();
        stats.record(10);
        stats.record(20);
        let snap = stats.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.median, 15.0);
        assert_eq!(snap.min, 10);
        assert_eq!(snap.max, 20);
        stats.reset();
        // Snapshot is detached from later mutation.
        assert_eq!(snap.count, 2);
    }
}
