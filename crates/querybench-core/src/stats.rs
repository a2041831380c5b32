use std::time::Duration;

/// Descriptive statistics over a set of latency samples.
///
/// Standard deviation is the population form (divide by N). Every caller in the
/// crate goes through this type so the convention stays uniform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationStats {
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub median: Duration,
    pub std_dev: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub samples: usize,
}

impl DurationStats {
    /// Empty input yields the zero value rather than an error.
    pub fn from_durations(durations: &[Duration]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let mut sorted = durations.to_vec();
        sorted.sort_unstable();
        Self::from_sorted(&sorted)
    }

    /// Caller guarantees `sorted` is ascending.
    pub fn from_sorted(sorted: &[Duration]) -> Self {
        let n = sorted.len();
        if n == 0 {
            return Self::default();
        }

        let total: u128 = sorted.iter().map(|d| d.as_nanos()).sum();
        let mean_ns = total as f64 / n as f64;

        let variance = sorted
            .iter()
            .map(|d| {
                let diff = d.as_nanos() as f64 - mean_ns;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean: nanos(mean_ns),
            median: percentile(sorted, 50.0),
            std_dev: nanos(variance.sqrt()),
            p95: percentile(sorted, 95.0),
            p99: percentile(sorted, 99.0),
            samples: n,
        }
    }
}

/// Nearest-rank percentile: `floor(n * pct / 100)`, clamped to the last index.
pub fn percentile(sorted: &[Duration], pct: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64 * pct / 100.0).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn nanos(ns: f64) -> Duration {
    if ns.is_finite() && ns > 0.0 {
        Duration::from_nanos(ns.round() as u64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_empty_is_zero_value() {
        let s = DurationStats::from_durations(&[]);
        assert_eq!(s, DurationStats::default());
        assert_eq!(s.samples, 0);
    }

    #[test]
    fn test_single_sample() {
        let s = DurationStats::from_durations(&[ms(7)]);
        assert_eq!(s.min, ms(7));
        assert_eq!(s.max, ms(7));
        assert_eq!(s.median, ms(7));
        assert_eq!(s.p95, ms(7));
        assert_eq!(s.p99, ms(7));
        assert_eq!(s.std_dev, Duration::ZERO);
    }

    #[test]
    fn test_nearest_rank_indices() {
        // 1..=10 ms: median idx 5 -> 6ms, p95 idx 9 -> 10ms, p99 idx 9 -> 10ms
        let data: Vec<Duration> = (1..=10).rev().map(ms).collect();
        let s = DurationStats::from_durations(&data);
        assert_eq!(s.median, ms(6));
        assert_eq!(s.p95, ms(10));
        assert_eq!(s.p99, ms(10));
        assert_eq!(s.mean, Duration::from_micros(5500));
    }

    #[test]
    fn test_percentile_on_larger_set() {
        let data: Vec<Duration> = (0..100).map(ms).collect();
        assert_eq!(percentile(&data, 95.0), ms(95));
        assert_eq!(percentile(&data, 99.0), ms(99));
        assert_eq!(percentile(&data, 100.0), ms(99));
    }

    #[test]
    fn test_population_std_dev() {
        // population std dev of {2,4,4,4,5,5,7,9} is exactly 2
        let data: Vec<Duration> = [2, 4, 4, 4, 5, 5, 7, 9].into_iter().map(ms).collect();
        let s = DurationStats::from_durations(&data);
        assert_eq!(s.std_dev, ms(2));
        assert_eq!(s.mean, ms(5));
    }

    #[test]
    fn test_ordering_property() {
        let seeds = [
            vec![5u64, 1, 9, 3, 3, 12, 40, 2],
            vec![100, 100, 100],
            vec![1, 2],
            (1..=257).map(|v| (v * 37) % 101).collect(),
        ];
        for seed in seeds {
            let data: Vec<Duration> = seed.into_iter().map(Duration::from_micros).collect();
            let s = DurationStats::from_durations(&data);
            assert!(s.min <= s.median);
            assert!(s.median <= s.p95);
            assert!(s.p95 <= s.p99);
            assert!(s.p99 <= s.max);
            assert!(s.min <= s.mean && s.mean <= s.max);
        }
    }
}
