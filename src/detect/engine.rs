use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use crate::detect::anomaly::{Baseline, TimeSeries};
use crate::detect::{Anomaly, Direction, Severity};
use crate::model::Metrics;

/// Flags readings that deviate from their metric's baseline.
///
/// Baselines only change through [`AnomalyDetector::update_baseline`];
/// `detect` never learns from the readings it scores.
#[derive(Default)]
pub struct AnomalyDetector {
    baselines: RwLock<HashMap<String, Baseline>>,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline for `metric` with the statistics of `values`.
    /// Empty input, or input holding NaN or infinite samples, leaves any
    /// existing baseline untouched.
    pub fn update_baseline(&self, metric: &str, values: &[f64]) {
        let Some(baseline) = TimeSeries::new(values.to_vec()).baseline() else {
            if !values.is_empty() {
                warn!(%metric, samples = values.len(), "Ignoring baseline with non-finite samples");
            }
            return;
        };
        debug!(%metric, mean = baseline.mean, std_dev = baseline.std_dev, samples = values.len(), "Baseline updated");
        self.baselines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metric.to_string(), baseline);
    }

    pub fn baseline(&self, metric: &str) -> Option<Baseline> {
        self.baselines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(metric)
            .copied()
    }

    /// Score every reading and return the reportable ones, in input order.
    pub fn detect(&self, metrics: &Metrics) -> Vec<Anomaly> {
        let baselines = self.baselines.read().unwrap_or_else(PoisonError::into_inner);

        metrics
            .iter()
            .filter_map(|(name, value)| {
                let baseline = baselines
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| Baseline::cold_start(value));
                let z_score = baseline.z_score(value);
                let severity = Severity::from_z_score(z_score)?;
                let direction = if value > baseline.mean {
                    Direction::Above
                } else {
                    Direction::Below
                };
                Some(Anomaly {
                    metric: name.to_string(),
                    value,
                    baseline_mean: baseline.mean,
                    z_score,
                    severity,
                    direction,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(entries: &[(&str, f64)]) -> Metrics {
        entries.iter().map(|(n, v)| (*n, *v)).collect()
    }

    #[test]
    fn test_cold_start_is_not_anomalous() {
        let detector = AnomalyDetector::new();
        assert!(detector.detect(&metrics(&[("x", 100.0)])).is_empty());
        assert!(detector.detect(&metrics(&[("zero", 0.0)])).is_empty());
    }

    #[test]
    fn test_high_severity_above() {
        let detector = AnomalyDetector::new();
        // Population stdev of [9, 11] is 1, mean 10.
        detector.update_baseline("x", &[9.0, 11.0]);

        let found = detector.detect(&metrics(&[("x", 16.0)]));
        assert_eq!(found.len(), 1);
        let a = &found[0];
        assert_eq!(a.metric, "x");
        assert!((a.z_score - 6.0).abs() < 1e-9);
        assert_eq!(a.severity, Severity::High);
        assert_eq!(a.direction, Direction::Above);
        assert_eq!(a.baseline_mean, 10.0);
    }

    #[test]
    fn test_medium_severity_below() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("x", &[9.0, 11.0]);

        let found = detector.detect(&metrics(&[("x", 7.5)]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Medium);
        assert_eq!(found[0].direction, Direction::Below);
    }

    #[test]
    fn test_within_band_not_reported() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("x", &[9.0, 11.0]);
        assert!(detector.detect(&metrics(&[("x", 11.5)])).is_empty());
    }

    #[test]
    fn test_constant_baseline_never_reports() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("flat", &[5.0, 5.0, 5.0]);
        assert!(detector.detect(&metrics(&[("flat", 500.0)])).is_empty());
    }

    #[test]
    fn test_empty_update_keeps_previous_baseline() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("x", &[9.0, 11.0]);
        detector.update_baseline("x", &[]);
        assert_eq!(
            detector.baseline("x"),
            Some(Baseline { mean: 10.0, std_dev: 1.0 })
        );
    }

    #[test]
    fn test_non_finite_readings_are_not_reported() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("x", &[9.0, 11.0]);

        let found = detector.detect(&metrics(&[
            ("cpu_load", f64::NAN),
            ("mem", f64::INFINITY),
            ("x", f64::NAN),
        ]));
        assert!(found.is_empty(), "unexpected anomalies: {found:?}");
        assert!(detector.detect(&metrics(&[("x", f64::NEG_INFINITY)])).is_empty());
    }

    #[test]
    fn test_non_finite_baseline_is_ignored() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("cpu_load", &[f64::NAN, 40.0]);
        assert_eq!(detector.baseline("cpu_load"), None);
        assert!(detector.detect(&metrics(&[("cpu_load", 41.0)])).is_empty());

        detector.update_baseline("x", &[9.0, 11.0]);
        detector.update_baseline("x", &[f64::INFINITY]);
        assert_eq!(
            detector.baseline("x"),
            Some(Baseline { mean: 10.0, std_dev: 1.0 })
        );
    }

    #[test]
    fn test_output_follows_input_order() {
        let detector = AnomalyDetector::new();
        detector.update_baseline("b", &[9.0, 11.0]);
        detector.update_baseline("a", &[9.0, 11.0]);

        let found = detector.detect(&metrics(&[("b", 20.0), ("c", 1.0), ("a", 0.0)]));
        let names: Vec<&str> = found.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
