//! Anomaly detection against per-metric statistical baselines.

pub mod anomaly;
pub mod engine;

pub use self::anomaly::{Baseline, TimeSeries};
pub use self::engine::AnomalyDetector;

use serde::{Deserialize, Serialize};

/// `|z|` at or above which a reading is reported.
pub const REPORT_THRESHOLD: f64 = 2.0;

/// Severity levels for a reported anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Classify a z-score. Returns `None` when the reading is not reportable,
    /// including NaN and infinite scores.
    pub fn from_z_score(z: f64) -> Option<Self> {
        let magnitude = z.abs();
        if !magnitude.is_finite() || magnitude < REPORT_THRESHOLD {
            None
        } else if magnitude > 3.0 {
            Some(Severity::High)
        } else if magnitude > 2.0 {
            Some(Severity::Medium)
        } else {
            // Exactly on the report threshold.
            Some(Severity::Low)
        }
    }
}

/// Which side of the baseline mean a reading fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

/// A metric reading statistically far from its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub metric: String,
    pub value: f64,
    pub baseline_mean: f64,
    pub z_score: f64,
    pub severity: Severity,
    pub direction: Direction,
}
