use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleetmedic::config::FleetMedicConfig;
use fleetmedic::{HealingContext, Metrics};

#[derive(Parser)]
#[command(
    name = "fleetmedic",
    about = "Self-healing control core for a distributed service fleet",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect anomalies in a metrics snapshot and diagnose them
    Analyze {
        /// Metrics as a JSON object, e.g. '{"cpu_load": 95}'
        #[arg(long)]
        metrics: String,

        /// Context as a JSON object (services, queues, containers, user)
        #[arg(long, default_value = "{}")]
        context: String,
    },

    /// Select and run (or plan) a remediation strategy
    Heal {
        /// Issue payload as JSON, optionally carrying a "diagnosis"
        #[arg(long)]
        issue: Option<String>,

        /// Context as a JSON object (services, queues, containers, user)
        #[arg(long, default_value = "{}")]
        context: String,

        /// Force a specific strategy instead of the diagnosis' candidates
        #[arg(long)]
        strategy: Option<String>,

        /// Apply the strategy instead of returning a dry-run plan
        #[arg(long)]
        apply: bool,
    },

    /// List the remediation strategy catalog
    Strategies {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Show recently persisted healing attempts
    Attempts {
        /// Maximum number of attempts to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Run a JSON-lines script of baseline/analyze/heal steps in one process
    Replay {
        /// Script file path
        #[arg(long)]
        file: PathBuf,
    },
}

fn init_tracing(config: &FleetMedicConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FleetMedicConfig::load(path)?,
        None => FleetMedicConfig::load_or_default(),
    };
    init_tracing(&config);

    match cli.command {
        Commands::Analyze { metrics, context } => {
            let metrics: Metrics = serde_json::from_str(&metrics).context("invalid --metrics JSON")?;
            let context: HealingContext = serde_json::from_str(&context).context("invalid --context JSON")?;
            let service = fleetmedic::build_service(&config).await?;
            let analysis = service.analyze(&metrics, &context).await;
            print_json(&analysis)?;
        }
        Commands::Heal {
            issue,
            context,
            strategy,
            apply,
        } => {
            let issue: serde_json::Value = match issue {
                Some(raw) => serde_json::from_str(&raw).context("invalid --issue JSON")?,
                None => serde_json::Value::Null,
            };
            let context: HealingContext = serde_json::from_str(&context).context("invalid --context JSON")?;
            let service = fleetmedic::build_service(&config).await?;
            tracing::info!(?strategy, dry_run = !apply, "Healing");
            let result = service.heal(&issue, &context, !apply, strategy.as_deref()).await?;
            print_json(&result)?;
        }
        Commands::Strategies { json } => {
            let strategies = fleetmedic::strategy::StrategyLibrary::new().list();
            if json {
                print_json(&serde_json::json!({ "strategies": strategies }))?;
            } else {
                println!("{:<20} | {:<6} | {:<4} | Description", "Strategy", "Safety", "Cost");
                println!("{:-<20}-|-{:-<6}-|-{:-<4}-|-{:-<40}", "", "", "", "");
                for s in strategies {
                    println!(
                        "{:<20} | {:<6} | {:<4.1} | {}",
                        s.name,
                        s.safety_level.to_string(),
                        s.cost,
                        s.description
                    );
                    let kinds: Vec<&str> = s.actions.iter().map(|a| a.kind()).collect();
                    println!("{:<20} | {:<6} | {:<4} |   -> Actions: {}", "", "", "", kinds.join(", "));
                }
            }
        }
        Commands::Attempts { limit } => {
            let service = fleetmedic::build_service(&config).await?;
            let attempts = service.recent_attempts(limit).await?;
            if attempts.is_empty() {
                println!("No healing attempts recorded.");
            } else {
                println!("{:<25} | {:<18} | {:<16} | {:<7} | Applied", "When", "Strategy", "Issue", "Dry run");
                println!("{:-<25}-|-{:-<18}-|-{:-<16}-|-{:-<7}-|-{:-<7}", "", "", "", "", "");
                for a in attempts {
                    println!(
                        "{:<25} | {:<18} | {:<16} | {:<7} | {}",
                        a.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        a.strategy,
                        a.issue_type,
                        a.dry_run,
                        a.applied
                    );
                }
            }
        }
        Commands::Replay { file } => {
            let script = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read replay script: {}", file.display()))?;
            let steps = fleetmedic::replay::parse_script(&script)?;
            let service = fleetmedic::build_service(&config).await?;
            tracing::info!(steps = steps.len(), "Replaying script");
            for step in steps {
                let result = fleetmedic::replay::run_step(&service, step).await?;
                print_json(&result)?;
            }
            print_json(&service.learning_stats())?;
        }
    }

    Ok(())
}
