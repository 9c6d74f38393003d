//! The self-healing control loop: analyze, then heal and learn.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{Diagnosis, DiagnosisEngine};
use crate::detect::{Anomaly, AnomalyDetector};
use crate::events::{AuditSink, EventBus};
use crate::model::{HealingContext, Metrics};
use crate::recovery::{ContainerControl, ExecutionOutcome, RecoveryExecutor, RejectReason};
use crate::storage::{AttemptStore, HealingAttempt};
use crate::strategy::{HealingStrategy, LearningEngine, StrategyLibrary, StrategyScore, StrategySelector};

pub const DEFAULT_EXCHANGE: &str = "ops.selfhealing";

/// Caller mistakes in the `heal` payload. Distinct from the domain-level
/// "no_strategy" / "unknown_strategy" results, which are values.
#[derive(Debug, Error)]
pub enum HealError {
    #[error("issue payload must be a JSON object, got {0}")]
    IssueNotObject(&'static str),
    #[error("malformed diagnosis in issue payload: {0}")]
    MalformedDiagnosis(#[source] serde_json::Error),
    #[error("diagnosis confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Output of `analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub anomalies: Vec<Anomaly>,
    pub diagnosis: Diagnosis,
}

/// A `heal` call that reached execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealReport {
    pub strategy: String,
    pub outcome: ExecutionOutcome,
    pub issue: Diagnosis,
    pub attempt_id: Uuid,
    /// Whether the attempt record reached the store.
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HealResult {
    /// No candidate strategy; nothing was executed, stored or learned.
    NoStrategy,
    Completed(HealReport),
}

impl HealResult {
    pub fn applied(&self) -> bool {
        match self {
            HealResult::NoStrategy => false,
            HealResult::Completed(report) => report.outcome.applied(),
        }
    }
}

impl Serialize for HealResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HealResult::NoStrategy => ExecutionOutcome::Rejected {
                reason: RejectReason::NoStrategy,
            }
            .serialize(serializer),
            HealResult::Completed(report) => report.serialize(serializer),
        }
    }
}

/// Snapshot of the selector's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub selector: BTreeMap<String, StrategyScore>,
}

/// External systems the service reports to.
pub struct Collaborators {
    pub audit: Arc<dyn AuditSink>,
    pub bus: Arc<dyn EventBus>,
    pub attempts: Arc<dyn AttemptStore>,
    /// Absent when no container runtime is reachable.
    pub containers: Option<Arc<dyn ContainerControl>>,
}

pub struct SelfHealingService {
    detector: AnomalyDetector,
    diagnoser: DiagnosisEngine,
    selector: Arc<StrategySelector>,
    executor: RecoveryExecutor,
    learner: LearningEngine,
    audit: Arc<dyn AuditSink>,
    bus: Arc<dyn EventBus>,
    attempts: Arc<dyn AttemptStore>,
    exchange: String,
}

impl SelfHealingService {
    pub fn new(collaborators: Collaborators) -> Self {
        let selector = Arc::new(StrategySelector::new());
        Self {
            detector: AnomalyDetector::new(),
            diagnoser: DiagnosisEngine::new(),
            learner: LearningEngine::new(Arc::clone(&selector)),
            selector,
            executor: RecoveryExecutor::new(StrategyLibrary::new(), collaborators.containers),
            audit: collaborators.audit,
            bus: collaborators.bus,
            attempts: collaborators.attempts,
            exchange: DEFAULT_EXCHANGE.to_string(),
        }
    }

    /// Publish on `exchange` instead of the default.
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn update_baseline(&self, metric: &str, values: &[f64]) {
        self.detector.update_baseline(metric, values);
    }

    /// Detect anomalies and diagnose them. Never touches strategy scores.
    pub async fn analyze(&self, metrics: &Metrics, context: &HealingContext) -> Analysis {
        let anomalies = self.detector.detect(metrics);
        let diagnosis = self.diagnoser.diagnose(&anomalies, context);
        info!(
            metrics = metrics.len(),
            anomalies = anomalies.len(),
            issue = %diagnosis.issue_type,
            confidence = diagnosis.confidence,
            "Analysis complete"
        );

        let analysis = Analysis { anomalies, diagnosis };
        self.notify("analyze", "self_healing.analyze", &to_payload(&analysis), context.user.as_deref())
            .await;
        analysis
    }

    /// Pick a strategy for `issue`, execute (or plan) it, record and learn.
    ///
    /// `issue` may carry a `diagnosis` from a previous `analyze`; without one
    /// the context alone is diagnosed. `strategy_override` replaces the
    /// diagnosis' candidates.
    pub async fn heal(
        &self,
        issue: &serde_json::Value,
        context: &HealingContext,
        dry_run: bool,
        strategy_override: Option<&str>,
    ) -> Result<HealResult, HealError> {
        let diagnosis = match diagnosis_from_issue(issue)? {
            Some(diagnosis) => diagnosis,
            None => self.diagnoser.diagnose(&[], context),
        };

        let candidates: Vec<String> = match strategy_override.filter(|s| !s.is_empty()) {
            Some(name) => vec![name.to_string()],
            None => diagnosis.recommended_strategies.clone(),
        };
        let Some(chosen) = self
            .selector
            .best(&candidates)
            .or_else(|| candidates.first().cloned())
        else {
            info!(issue = %diagnosis.issue_type, "No candidate strategy");
            return Ok(HealResult::NoStrategy);
        };

        let outcome = self.executor.execute(&chosen, context, dry_run).await;

        let attempt = HealingAttempt {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            strategy: chosen.clone(),
            dry_run,
            applied: outcome.applied(),
            issue_type: diagnosis.issue_type,
            root_cause: diagnosis.root_cause.clone(),
            outcome: to_payload(&outcome),
        };
        let persisted = match self.attempts.create_healing_attempt(&attempt).await {
            Ok(()) => true,
            Err(e) => {
                warn!(attempt = %attempt.id, error = %e, "Failed to persist healing attempt");
                false
            }
        };

        self.learner.update(&chosen, &outcome);

        info!(
            strategy = %chosen,
            dry_run,
            applied = outcome.applied(),
            persisted,
            "Heal complete"
        );

        let report = HealReport {
            strategy: chosen,
            outcome,
            issue: diagnosis,
            attempt_id: attempt.id,
            persisted,
        };
        self.notify("heal", "self_healing.heal", &to_payload(&report), context.user.as_deref())
            .await;
        Ok(HealResult::Completed(report))
    }

    pub fn strategies(&self) -> &'static [HealingStrategy] {
        self.executor.library().list()
    }

    pub fn learning_stats(&self) -> LearningStats {
        LearningStats {
            selector: self.selector.snapshot(),
        }
    }

    pub async fn recent_attempts(&self, limit: usize) -> anyhow::Result<Vec<HealingAttempt>> {
        self.attempts.list_recent(limit).await
    }

    /// Best-effort publish + audit. Failures are logged, never returned.
    async fn notify(&self, routing_key: &str, audit_event: &str, payload: &serde_json::Value, actor: Option<&str>) {
        if let Err(e) = self.bus.publish(&self.exchange, routing_key, payload).await {
            warn!(exchange = %self.exchange, %routing_key, error = %e, "Failed to publish event");
        }
        if let Err(e) = self.audit.record_event(audit_event, payload, actor).await {
            warn!(event = %audit_event, error = %e, "Failed to record audit event");
        }
    }
}

fn diagnosis_from_issue(issue: &serde_json::Value) -> Result<Option<Diagnosis>, HealError> {
    use serde_json::Value;

    let object = match issue {
        Value::Null => return Ok(None),
        Value::Object(object) => object,
        Value::Bool(_) => return Err(HealError::IssueNotObject("a boolean")),
        Value::Number(_) => return Err(HealError::IssueNotObject("a number")),
        Value::String(_) => return Err(HealError::IssueNotObject("a string")),
        Value::Array(_) => return Err(HealError::IssueNotObject("an array")),
    };

    let Some(raw) = object.get("diagnosis") else {
        return Ok(None);
    };
    let diagnosis = Diagnosis::deserialize(raw).map_err(HealError::MalformedDiagnosis)?;
    if !(0.0..=1.0).contains(&diagnosis.confidence) {
        return Err(HealError::ConfidenceOutOfRange(diagnosis.confidence));
    }
    Ok(Some(diagnosis))
}

fn to_payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize event payload");
        serde_json::Value::Null
    })
}
