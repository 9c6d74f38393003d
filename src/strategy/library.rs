use serde::Serialize;

use crate::strategy::StrategyError;

/// How safe a strategy is to apply without operator review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyLevel::Low => write!(f, "low"),
            SafetyLevel::Medium => write!(f, "medium"),
            SafetyLevel::High => write!(f, "high"),
        }
    }
}

/// What an action is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionTarget {
    Service,
}

/// A single remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "docker.restart")]
    ContainerRestart { target: ActionTarget },
    #[serde(rename = "scale")]
    Scale { target: ActionTarget, delta: i32 },
    #[serde(rename = "rebalance")]
    Rebalance,
    /// Limit traffic to `amount` of its current rate.
    #[serde(rename = "rate_limit")]
    RateLimit { amount: f64 },
    #[serde(rename = "queue.purge")]
    QueuePurge,
    /// Stop then start.
    #[serde(rename = "docker.recycle")]
    ContainerRecycle,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::ContainerRestart { .. } => "docker.restart",
            Action::Scale { .. } => "scale",
            Action::Rebalance => "rebalance",
            Action::RateLimit { .. } => "rate_limit",
            Action::QueuePurge => "queue.purge",
            Action::ContainerRecycle => "docker.recycle",
        }
    }

    /// Whether the action is carried out against container infrastructure.
    pub fn targets_containers(&self) -> bool {
        matches!(self, Action::ContainerRestart { .. } | Action::ContainerRecycle)
    }
}

/// A named, catalogued remediation plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealingStrategy {
    pub name: &'static str,
    pub description: &'static str,
    pub safety_level: SafetyLevel,
    /// Relative cost in [0, 1].
    pub cost: f64,
    pub actions: &'static [Action],
}

const CATALOG: &[HealingStrategy] = &[
    HealingStrategy {
        name: "restart_unhealthy",
        description: "Restart unhealthy containers/services",
        safety_level: SafetyLevel::High,
        cost: 0.2,
        actions: &[Action::ContainerRestart { target: ActionTarget::Service }],
    },
    HealingStrategy {
        name: "scale_service",
        description: "Increase service replicas to handle load",
        safety_level: SafetyLevel::Medium,
        cost: 0.4,
        actions: &[Action::Scale { target: ActionTarget::Service, delta: 1 }],
    },
    HealingStrategy {
        name: "rebalance_load",
        description: "Rebalance work across nodes",
        safety_level: SafetyLevel::High,
        cost: 0.3,
        actions: &[Action::Rebalance],
    },
    HealingStrategy {
        name: "throttle_traffic",
        description: "Apply rate limits to reduce pressure",
        safety_level: SafetyLevel::Low,
        cost: 0.1,
        actions: &[Action::RateLimit { amount: 0.8 }],
    },
    HealingStrategy {
        name: "purge_stuck",
        description: "Remove stuck items from queues",
        safety_level: SafetyLevel::Medium,
        cost: 0.2,
        actions: &[Action::QueuePurge],
    },
    HealingStrategy {
        name: "recycle_container",
        description: "Stop and start a container to clear state",
        safety_level: SafetyLevel::Medium,
        cost: 0.3,
        actions: &[Action::ContainerRecycle],
    },
];

/// Immutable catalog of the strategies this process knows how to run.
#[derive(Debug, Clone, Copy)]
pub struct StrategyLibrary {
    strategies: &'static [HealingStrategy],
}

impl Default for StrategyLibrary {
    fn default() -> Self {
        Self { strategies: CATALOG }
    }
}

impl StrategyLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// All strategies, in catalog order.
    pub fn list(&self) -> &'static [HealingStrategy] {
        self.strategies
    }

    pub fn get(&self, name: &str) -> Result<&'static HealingStrategy, StrategyError> {
        self.strategies
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }
}
