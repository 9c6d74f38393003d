//! JSON-lines scripts driving a single service instance.
//!
//! Each non-blank line is one step:
//!
//! ```text
//! {"op": "baseline", "metric": "cpu_load", "values": [40, 35, 45]}
//! {"op": "analyze", "metrics": {"cpu_load": 95}, "context": {"services": ["svc-a"]}}
//! {"op": "heal", "issue": {}, "context": {}, "dry_run": false, "strategy": "scale_service"}
//! ```
//!
//! Lines starting with `#` are comments.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{HealingContext, Metrics};
use crate::service::SelfHealingService;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    Baseline {
        metric: String,
        values: Vec<f64>,
    },
    Analyze {
        metrics: Metrics,
        #[serde(default)]
        context: HealingContext,
    },
    Heal {
        #[serde(default)]
        issue: serde_json::Value,
        #[serde(default)]
        context: HealingContext,
        #[serde(default = "default_dry_run")]
        dry_run: bool,
        #[serde(default)]
        strategy: Option<String>,
    },
}

fn default_dry_run() -> bool {
    true
}

/// Parse a script into steps, reporting the offending line on error.
pub fn parse_script(script: &str) -> Result<Vec<ReplayStep>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid replay step on line {}", idx + 1))
        })
        .collect()
}

/// Run one step and return its JSON result.
pub async fn run_step(service: &SelfHealingService, step: ReplayStep) -> Result<serde_json::Value> {
    let result = match step {
        ReplayStep::Baseline { metric, values } => {
            service.update_baseline(&metric, &values);
            serde_json::json!({"baseline": metric, "samples": values.len()})
        }
        ReplayStep::Analyze { metrics, context } => {
            serde_json::to_value(service.analyze(&metrics, &context).await)?
        }
        ReplayStep::Heal {
            issue,
            context,
            dry_run,
            strategy,
        } => {
            let result = service
                .heal(&issue, &context, dry_run, strategy.as_deref())
                .await?;
            serde_json::to_value(result)?
        }
    };
    Ok(result)
}
