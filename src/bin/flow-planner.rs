//! # Replication Flow Planner
//!
//! Command-line tool that validates replication flow configuration and renders the
//! event-bus rules and targets each job flow deploys.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use replication_flow::choreography::{JobFlowBuilder, JobFlowPlan};
use replication_flow::config::ConfigManager;
use replication_flow::logging::init_structured_logging;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flow-planner")]
#[command(about = "Validate replication flow configuration and render its event-bus rules")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment overlay to load (development, test, production, ...)
    #[arg(short, long, env = "REPLICATION_FLOW_ENV", default_value = "development")]
    environment: String,

    /// Configuration directory (default: config/replication-flow)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate configuration
    Validate,

    /// Print the rules and targets of every job flow as JSON
    Plan {
        /// Only the flow of this job
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Print the resolved configuration with secrets masked
    ShowConfig,

    /// Upsert the rules and targets of every job flow on EventBridge
    #[cfg(feature = "aws")]
    Deploy {
        #[arg(short, long)]
        job: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    init_structured_logging();
    let cli = Cli::parse();

    let result = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
        .with_context(|| format!("loading '{}' configuration", cli.environment));
    let result = match result {
        Ok(manager) => run(&cli, manager).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("flow-planner failed: {e:#}");
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

async fn run(cli: &Cli, manager: Arc<ConfigManager>) -> Result<()> {
    match &cli.command {
        None | Some(Commands::Validate) => validate(&manager),
        Some(Commands::Plan { job }) => {
            for plan in build_plans(&manager, job.as_deref())? {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
            Ok(())
        }
        Some(Commands::ShowConfig) => {
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
            Ok(())
        }
        #[cfg(feature = "aws")]
        Some(Commands::Deploy { job }) => deploy(&manager, job.as_deref()).await,
    }
}

fn validate(manager: &ConfigManager) -> Result<()> {
    println!("🔧 Validating replication flow configuration");
    println!("Environment: {}", manager.environment());
    println!("Config Directory: {}", manager.config_directory().display());
    println!();

    let plans = build_plans(manager, None)?;
    println!("✅ {} jobs, {} job flows", manager.registry().job_count(), plans.len());
    for plan in &plans {
        println!(
            "   {} → {} rules, {} targets",
            plan.job_name,
            plan.rules.len(),
            plan.target_count()
        );
    }
    info!(flows = plans.len(), "Configuration is valid");
    Ok(())
}

fn build_plans(
    manager: &ConfigManager,
    job: Option<&str>,
) -> Result<Vec<JobFlowPlan>> {
    let builder = JobFlowBuilder::new(manager.config().event_bus.clone());
    let registry = manager.registry();

    let flows = match job {
        Some(job_name) => vec![registry
            .flow(job_name)
            .ok_or_else(|| anyhow!("No job flow configured for job '{job_name}'"))?],
        None => registry.flows(),
    };

    flows
        .into_iter()
        .map(|flow| {
            builder
                .build(flow)
                .with_context(|| format!("building rules for job '{}'", flow.job_name))
        })
        .collect()
}

#[cfg(feature = "aws")]
async fn deploy(manager: &ConfigManager, job: Option<&str>) -> Result<()> {
    use replication_flow::aws::{load_sdk_config, EventBridgeBus};
    use replication_flow::choreography::JobFlowDeployer;

    let sdk_config = load_sdk_config().await;
    let bus = Arc::new(EventBridgeBus::new(&sdk_config, manager.config().event_bus.clone()));
    let deployer = JobFlowDeployer::new(bus);

    for plan in build_plans(manager, job)? {
        deployer
            .deploy(&plan)
            .await
            .with_context(|| format!("deploying job '{}'", plan.job_name))?;
        println!("✅ Deployed {} ({} rules)", plan.job_name, plan.rules.len());
    }
    Ok(())
}
