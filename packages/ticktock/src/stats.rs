use crate::Nanos;

/// Running statistics about the durations observed for one end point of a clock.
///
/// Statistics are updated in a single pass (Welford's online algorithm), so each
/// observation costs O(1) time and space no matter how many came before it.
///
/// A `RunningStats` always holds at least one observation: it is created from the
/// first one and updated with every subsequent one.
#[derive(Clone, Debug, PartialEq)]
pub struct RunningStats {
    count: u64,
    last: Nanos,
    min: Nanos,
    max: Nanos,

    mean: f64,

    // Sum of squared deviations from the mean.
    m2: f64,
}

impl RunningStats {
    /// Creates the statistics of a single observation.
    #[must_use]
    pub fn new(elapsed: Nanos) -> Self {
        Self {
            count: 1,
            last: elapsed,
            min: elapsed,
            max: elapsed,
            mean: nanos_to_f64(elapsed),
            m2: 0.0,
        }
    }

    /// Adds an observation to the statistics.
    pub fn update(&mut self, elapsed: Nanos) {
        // Crate policy is that absurd counts may be mangled, not that they panic.
        self.count = self.count.saturating_add(1);

        self.max = self.max.max(elapsed);
        self.min = self.min.min(elapsed);
        self.last = elapsed;

        let sample = nanos_to_f64(elapsed);
        let delta = sample - self.mean;
        self.mean += delta / count_to_f64(self.count);
        let delta2 = sample - self.mean;
        self.m2 += delta * delta2;
    }

    /// Number of observations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The most recent observation.
    #[must_use]
    pub fn last(&self) -> Nanos {
        self.last
    }

    /// The smallest observation.
    #[must_use]
    pub fn min(&self) -> Nanos {
        self.min
    }

    /// The largest observation.
    #[must_use]
    pub fn max(&self) -> Nanos {
        self.max
    }

    /// Arithmetic mean of all observations.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation of all observations.
    ///
    /// Zero until there are at least two observations.
    #[must_use]
    pub fn std(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }

        (self.m2 / count_to_f64(self.count.saturating_sub(1))).sqrt()
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "durations beyond 2^53 ns (~104 days) lose sub-nanosecond precision, which is fine"
)]
fn nanos_to_f64(value: Nanos) -> f64 {
    value as f64
}

#[expect(
    clippy::cast_precision_loss,
    reason = "counts beyond 2^53 are unrealistic and imprecision there is acceptable"
)]
fn count_to_f64(value: u64) -> f64 {
    value as f64
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn stats_of(samples: &[Nanos]) -> RunningStats {
        let (first, rest) = samples.split_first().expect("at least one sample");

        let mut stats = RunningStats::new(*first);
        for sample in rest {
            stats.update(*sample);
        }

        stats
    }

    #[test]
    fn single_observation_seeds_everything() {
        let stats = RunningStats::new(42);

        assert_eq!(stats.count(), 1);
        assert_eq!(stats.last(), 42);
        assert_eq!(stats.min(), 42);
        assert_eq!(stats.max(), 42);
        assert_close(stats.mean(), 42.0);
        assert_close(stats.std(), 0.0);
    }

    #[test]
    fn tracks_extremes_and_last() {
        let stats = stats_of(&[50, 10, 90, 30]);

        assert_eq!(stats.count(), 4);
        assert_eq!(stats.last(), 30);
        assert_eq!(stats.min(), 10);
        assert_eq!(stats.max(), 90);
    }

    #[test]
    fn mean_is_arithmetic_mean() {
        let stats = stats_of(&[100, 200, 300]);

        assert_close(stats.mean(), 200.0);
    }

    #[test]
    fn std_is_sample_standard_deviation() {
        // Mean 5, squared deviations sum to 32, divided by n - 1 = 7.
        let stats = stats_of(&[2, 4, 4, 4, 5, 5, 7, 9]);

        assert_close(stats.mean(), 5.0);
        assert_close(stats.std(), (32.0_f64 / 7.0).sqrt());
    }

    #[test]
    fn constant_observations_have_zero_std() {
        let stats = stats_of(&[7; 100]);

        assert_eq!(stats.count(), 100);
        assert_close(stats.mean(), 7.0);
        assert_close(stats.std(), 0.0);
    }

    #[test]
    fn large_offsets_stay_numerically_stable() {
        // A naive sum-of-squares implementation loses all precision here.
        let base = 1_000_000_000_000;
        let stats = stats_of(&[base + 4, base + 7, base + 13, base + 16]);

        assert_close(stats.std(), 30.0_f64.sqrt());
    }
}
