use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::detect::Anomaly;
use crate::model::HealingContext;

/// Classified root-cause category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Degradation,
    Backpressure,
    ResourceHotspot,
    MemoryPressure,
    Unknown,
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueType::Degradation => write!(f, "degradation"),
            IssueType::Backpressure => write!(f, "backpressure"),
            IssueType::ResourceHotspot => write!(f, "resource_hotspot"),
            IssueType::MemoryPressure => write!(f, "memory_pressure"),
            IssueType::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "degradation" => Ok(IssueType::Degradation),
            "backpressure" => Ok(IssueType::Backpressure),
            "resource_hotspot" => Ok(IssueType::ResourceHotspot),
            "memory_pressure" => Ok(IssueType::MemoryPressure),
            "unknown" => Ok(IssueType::Unknown),
            other => Err(format!("unknown issue type '{other}'")),
        }
    }
}

/// A root-cause hypothesis with remediation candidates, primary first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub issue_type: IssueType,
    pub root_cause: String,
    pub confidence: f64,
    #[serde(default)]
    pub impacted_components: Vec<String>,
    #[serde(default)]
    pub recommended_strategies: Vec<String>,
}

impl Diagnosis {
    fn new(
        issue_type: IssueType,
        root_cause: &str,
        confidence: f64,
        impacted_components: Vec<String>,
        recommended_strategies: &[&str],
    ) -> Self {
        Self {
            issue_type,
            root_cause: root_cause.to_string(),
            confidence,
            impacted_components,
            recommended_strategies: recommended_strategies
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// The diagnosis produced when no rule matches.
    pub fn unknown() -> Self {
        Self::new(IssueType::Unknown, "insufficient data", 0.5, Vec::new(), &[])
    }

    pub fn primary_strategy(&self) -> Option<&str> {
        self.recommended_strategies.first().map(String::as_str)
    }
}

/// Maps anomalies plus context onto a single diagnosis.
///
/// Rules are evaluated in a fixed order and the first match wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosisEngine;

impl DiagnosisEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn diagnose(&self, anomalies: &[Anomaly], context: &HealingContext) -> Diagnosis {
        let by_metric: HashMap<&str, &Anomaly> =
            anomalies.iter().map(|a| (a.metric.as_str(), a)).collect();

        let cpu = by_metric.get("cpu_load");
        let mem = by_metric.get("memory_usage");
        let err = by_metric.get("error_rate");
        let lat = by_metric.get("latency_p95");
        let queue = by_metric.get("queue_depth");

        if err.is_some() && (cpu.is_some() || mem.is_some()) {
            return Diagnosis::new(
                IssueType::Degradation,
                "elevated error rate under resource pressure",
                0.75,
                context.services.clone(),
                &["scale_service", "restart_unhealthy", "throttle_traffic"],
            );
        }

        if let (Some(lat), Some(queue)) = (lat, queue) {
            if lat.z_score > 2.0 && queue.z_score > 2.0 {
                return Diagnosis::new(
                    IssueType::Backpressure,
                    "queue growth causing latency",
                    0.70,
                    context.queues.clone(),
                    &["increase_workers", "rebalance_load", "purge_stuck"],
                );
            }
        }

        if cpu.is_some_and(|a| a.z_score > 3.0) {
            return Diagnosis::new(
                IssueType::ResourceHotspot,
                "sustained high CPU",
                0.65,
                context.services.clone(),
                &["scale_service", "restart_unhealthy"],
            );
        }

        if mem.is_some_and(|a| a.z_score > 3.0) {
            return Diagnosis::new(
                IssueType::MemoryPressure,
                "sustained high memory",
                0.65,
                context.services.clone(),
                &["restart_unhealthy", "recycle_container"],
            );
        }

        Diagnosis::unknown()
    }
}
