use serde::{Deserialize, Serialize};

/// Smallest standard deviation a synthesized baseline may have.
pub const MIN_COLD_START_STD_DEV: f64 = 1e-6;

/// Fraction of `|value|` used as the standard deviation on cold start.
pub const COLD_START_STD_DEV_RATIO: f64 = 0.05;

/// A simple time series for statistical analysis.
pub struct TimeSeries {
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance. Zero for fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self
            .values
            .iter()
            .map(|&x| (x - mean).powi(2))
            .sum();
        sum_sq_diff / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Summarize the series as a baseline, or `None` if there is no data
    /// or any sample is NaN or infinite.
    pub fn baseline(&self) -> Option<Baseline> {
        if self.is_empty() || self.values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Baseline {
            mean: self.mean(),
            std_dev: self.std_dev(),
        })
    }
}

/// Expected (mean, stdev) for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub std_dev: f64,
}

impl Baseline {
    /// Baseline synthesized from a single reading when no history exists.
    ///
    /// The reading sits exactly on the mean, so a cold start never reports.
    pub fn cold_start(value: f64) -> Self {
        Self {
            mean: value,
            std_dev: (value.abs() * COLD_START_STD_DEV_RATIO).max(MIN_COLD_START_STD_DEV),
        }
    }

    /// Z = (value - mean) / std_dev, or 0 for a degenerate baseline.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.std_dev == 0.0 {
            return 0.0;
        }
        (value - self.mean) / self.std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ts.mean(), 3.0);
        // Population variance of 1..5 is 2.0
        assert!((ts.variance() - 2.0).abs() < 1e-12);
        let baseline = ts.baseline().unwrap();
        // (10 - 3) / 1.414 ~ 4.95
        assert!(baseline.z_score(10.0) > 4.9);
    }

    #[test]
    fn test_single_sample_has_zero_std_dev() {
        let baseline = TimeSeries::new(vec![42.0]).baseline().unwrap();
        assert_eq!(baseline.mean, 42.0);
        assert_eq!(baseline.std_dev, 0.0);
        assert_eq!(baseline.z_score(1000.0), 0.0);
    }

    #[test]
    fn test_empty_series_has_no_baseline() {
        assert!(TimeSeries::new(vec![]).baseline().is_none());
    }

    #[test]
    fn test_non_finite_series_has_no_baseline() {
        assert!(TimeSeries::new(vec![f64::NAN, 40.0]).baseline().is_none());
        assert!(TimeSeries::new(vec![40.0, f64::INFINITY]).baseline().is_none());
    }

    #[test]
    fn test_cold_start_floor() {
        let b = Baseline::cold_start(0.0);
        assert_eq!(b.std_dev, MIN_COLD_START_STD_DEV);
        let b = Baseline::cold_start(-200.0);
        assert!((b.std_dev - 10.0).abs() < 1e-12);
        assert_eq!(b.z_score(-200.0), 0.0);
    }
}
