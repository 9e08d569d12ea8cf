use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use swarmgate_lib::config::ConfigManager;
use swarmgate_lib::models::ComplexityClass;
use swarmgate_lib::plan::TaskPlan;
use swarmgate_lib::scheduler::orchestrator::{Orchestrator, RunOutcome};
use swarmgate_lib::verify;
use swarmgate_lib::workspace::Workspace;

#[derive(Parser)]
#[command(
    name = "swarmgate",
    about = "Scheduler and verification gate for parallel worker processes over a shared git workspace",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .swarmgate/ with a default config in the workspace
    Init {
        /// Workspace directory (a git repository)
        #[arg(default_value = ".")]
        workspace_dir: PathBuf,
    },

    /// Run the task plan to completion or deadlock
    Run {
        /// Workspace directory (a git repository)
        #[arg(default_value = ".")]
        workspace_dir: PathBuf,

        /// Plan file; defaults to .swarmgate/plan.yaml in the workspace
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Verify the workspace's current uncommitted changes and exit
    /// 0 (accepted), 1 (rejected) or 2 (secrets found). Non-accepted
    /// outcomes revert the workspace.
    Verify {
        /// Workspace directory (a git repository)
        workspace_dir: PathBuf,

        /// Directory receiving the result artifacts
        results_dir: PathBuf,

        /// Comma-separated declared write-set, workspace-relative
        expected_files: String,

        /// Complexity class sizing the diff ceilings
        #[arg(default_value = "medium")]
        complexity_class: ComplexityClass,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init { workspace_dir } => init(workspace_dir),
        Commands::Run {
            workspace_dir,
            plan,
        } => run(workspace_dir, plan).await,
        Commands::Verify {
            workspace_dir,
            results_dir,
            expected_files,
            complexity_class,
        } => verify_cmd(workspace_dir, results_dir, expected_files, complexity_class),
    }
}

fn init(workspace_dir: PathBuf) -> Result<()> {
    let manager = ConfigManager::new(&workspace_dir);
    manager
        .initialize()
        .context("Failed to initialize workspace config")?;
    println!("Initialized {}", manager.dot_dir().display());
    Ok(())
}

async fn run(workspace_dir: PathBuf, plan: Option<PathBuf>) -> Result<()> {
    let manager = ConfigManager::new(&workspace_dir);
    let config = manager.load().context("Failed to load config")?;

    let plan_path = plan.unwrap_or_else(|| manager.plan_path());
    let graph = TaskPlan::load(&plan_path)
        .context("Failed to load task plan")?
        .into_graph()?;

    let workspace = Workspace::open(&workspace_dir).context("Failed to open workspace")?;
    let mut orchestrator = Orchestrator::new(workspace, graph, config)?;
    let summary = orchestrator.run().await?;

    println!(
        "{}/{} task(s) done, {} abandoned",
        summary.done, summary.total, summary.abandoned
    );

    match summary.outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Deadlocked { blocked } => {
            anyhow::bail!("Deadlocked with blocked tasks: {}", blocked.join(", "))
        }
    }
}

fn verify_cmd(
    workspace_dir: PathBuf,
    results_dir: PathBuf,
    expected_files: String,
    complexity_class: ComplexityClass,
) -> Result<()> {
    let manager = ConfigManager::new(&workspace_dir);
    let config = manager.load().context("Failed to load config")?;
    let workspace = Workspace::open(&workspace_dir).context("Failed to open workspace")?;

    let declared: BTreeSet<String> = expected_files
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    let report = verify::evaluate(&workspace, &declared, complexity_class, &config.gate)?;
    report.write_artifacts(&results_dir)?;
    verify::enforce(&workspace, &report)?;

    println!("{}", report.decision.status_token());
    std::process::exit(report.decision.exit_code());
}
