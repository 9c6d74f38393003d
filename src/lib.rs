//! FleetMedic -- self-healing control core for a distributed service fleet.
//!
//! This crate ingests runtime metrics, detects statistical anomalies,
//! diagnoses probable root causes, picks a remediation strategy from
//! learned success rates, executes it (or plans it on a dry run) and feeds
//! the outcome back into future selection.

pub mod analysis;
pub mod config;
pub mod detect;
pub mod events;
pub mod model;
pub mod recovery;
pub mod replay;
pub mod service;
pub mod storage;
pub mod strategy;

pub use crate::model::{HealingContext, Metrics};
pub use crate::service::{Analysis, Collaborators, HealError, HealReport, HealResult, LearningStats, SelfHealingService};

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::FleetMedicConfig;
use crate::events::{AuditLog, BroadcastBus};
use crate::recovery::{ContainerControl, DockerCli};
use crate::storage::SqliteAttemptStore;

/// Wire up a service from configuration: storage, audit log, event bus,
/// optional container control, and seeded baselines.
pub async fn build_service(config: &FleetMedicConfig) -> Result<SelfHealingService> {
    // 1. Initialize Storage
    let db_path = config.storage.db_path.to_string_lossy();
    tracing::info!(%db_path, "Initializing database");
    let pool = storage::open_pool(&db_path)?;

    // 2. Audit + events
    let audit = AuditLog::new(config.logging.audit_log_path.clone())
        .await
        .context("failed to open audit log")?;
    let bus = BroadcastBus::new(config.events.channel_capacity);

    // 3. Container control is decided once, here.
    let containers: Option<Arc<dyn ContainerControl>> = if config.containers.enabled {
        DockerCli::detect(&config.containers.docker_bin)
            .await
            .map(|cli| Arc::new(cli) as Arc<dyn ContainerControl>)
    } else {
        tracing::info!("Container control disabled, container actions will be simulated");
        None
    };

    let service = SelfHealingService::new(Collaborators {
        audit: Arc::new(audit),
        bus: Arc::new(bus),
        attempts: Arc::new(SqliteAttemptStore::new(pool)),
        containers,
    })
    .with_exchange(config.events.exchange.clone());

    // 4. Seed baselines
    for (metric, values) in &config.baselines {
        service.update_baseline(metric, values);
    }
    if !config.baselines.is_empty() {
        tracing::info!(metrics = config.baselines.len(), "Seeded baselines from config");
    }

    Ok(service)
}
