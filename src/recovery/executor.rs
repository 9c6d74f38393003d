use std::sync::Arc;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::HealingContext;
use crate::recovery::ContainerControl;
use crate::strategy::{Action, StrategyLibrary};

/// Why nothing was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownStrategy,
    NoStrategy,
}

/// The actions a strategy would perform, returned on dry runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub strategy: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Error,
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: ActionStatus,
    /// Containers the action was applied to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionReport {
    fn simulated(action: &Action) -> Self {
        Self {
            kind: action.kind(),
            status: ActionStatus::Ok,
            targets: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Rejected { reason: RejectReason },
    DryRun { plan: ExecutionPlan },
    Applied {
        strategy: String,
        actions: Vec<ActionReport>,
    },
}

impl ExecutionOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, ExecutionOutcome::Applied { .. })
    }
}

impl Serialize for ExecutionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("applied", &self.applied())?;
        match self {
            ExecutionOutcome::Rejected { reason } => {
                map.serialize_entry("reason", reason)?;
            }
            ExecutionOutcome::DryRun { plan } => {
                map.serialize_entry("dry_run", &true)?;
                map.serialize_entry("plan", plan)?;
            }
            ExecutionOutcome::Applied { strategy, actions } => {
                map.serialize_entry("strategy", strategy)?;
                map.serialize_entry("actions", actions)?;
            }
        }
        map.end()
    }
}

/// Executes catalogued strategies, optionally against real containers.
///
/// Container control is decided once at construction. Without it, every
/// action is simulated.
pub struct RecoveryExecutor {
    library: StrategyLibrary,
    containers: Option<Arc<dyn ContainerControl>>,
}

impl RecoveryExecutor {
    pub fn new(library: StrategyLibrary, containers: Option<Arc<dyn ContainerControl>>) -> Self {
        Self { library, containers }
    }

    pub fn library(&self) -> &StrategyLibrary {
        &self.library
    }

    pub fn has_container_control(&self) -> bool {
        self.containers.is_some()
    }

    pub async fn execute(
        &self,
        strategy_name: &str,
        context: &HealingContext,
        dry_run: bool,
    ) -> ExecutionOutcome {
        let Ok(strategy) = self.library.get(strategy_name) else {
            warn!(strategy = %strategy_name, "Unknown strategy requested");
            return ExecutionOutcome::Rejected {
                reason: RejectReason::UnknownStrategy,
            };
        };

        if dry_run {
            debug!(strategy = %strategy.name, "Dry run, returning plan");
            return ExecutionOutcome::DryRun {
                plan: ExecutionPlan {
                    strategy: strategy.name.to_string(),
                    actions: strategy.actions.to_vec(),
                },
            };
        }

        let mut actions = Vec::with_capacity(strategy.actions.len());
        for action in strategy.actions {
            let report = match &self.containers {
                Some(control) if action.targets_containers() => {
                    apply_to_containers(control.as_ref(), action, &context.containers).await
                }
                _ => ActionReport::simulated(action),
            };
            actions.push(report);
        }

        info!(strategy = %strategy.name, actions = actions.len(), "Strategy applied");
        ExecutionOutcome::Applied {
            strategy: strategy.name.to_string(),
            actions,
        }
    }
}

/// Run a container action on every id. A failing container does not stop
/// the rest; its error is folded into the report.
async fn apply_to_containers(
    control: &dyn ContainerControl,
    action: &Action,
    ids: &[String],
) -> ActionReport {
    let mut errors = Vec::new();
    for id in ids {
        let result = match action {
            Action::ContainerRestart { .. } => control.restart(id).await,
            Action::ContainerRecycle => match control.stop(id).await {
                Ok(()) => control.start(id).await,
                Err(e) => Err(e),
            },
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(action = action.kind(), container = %id, error = %e, "Container action failed");
            errors.push(format!("{id}: {e}"));
        }
    }

    ActionReport {
        kind: action.kind(),
        status: if errors.is_empty() {
            ActionStatus::Ok
        } else {
            ActionStatus::Error
        },
        targets: ids.to_vec(),
        error: (!errors.is_empty()).then(|| errors.join("; ")),
    }
}
